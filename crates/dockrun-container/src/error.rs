//! Error types for container launch.

use thiserror::Error;

/// Errors that can occur while running a task container.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Container engine CLI not found.
    #[error("Container engine not found at '{0}'. Ensure docker is installed.")]
    EngineNotFound(String),

    /// Failed to spawn the engine process.
    #[error("Failed to spawn container process: {0}")]
    SpawnError(#[from] std::io::Error),

    /// Container exited with a non-zero status.
    #[error("Container '{name}' exited with code {code}")]
    NonZeroExit { name: String, code: i32 },

    /// Container was terminated without an exit code.
    #[error("Container '{0}' was terminated by a signal")]
    Terminated(String),

    /// The spec cannot be launched.
    #[error("Invalid container spec: {0}")]
    InvalidSpec(String),
}
