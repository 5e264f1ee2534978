//! Worker error types.

use std::path::{Path, PathBuf};

use dockrun_container::ContainerError;
use dockrun_core::{CoreError, DatasetId, ModelId, ProjectId, TaskId, TaskStep};
use thiserror::Error;

/// Errors raised while retrieving task artifacts.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Model {0} not found in artifact store")]
    ModelNotFound(ModelId),

    #[error("Dataset {dataset} of project {project} not found in artifact store")]
    DatasetNotFound {
        project: ProjectId,
        dataset: DatasetId,
    },

    #[error("Hash mismatch for model {id}: expected {expected}, got {actual}")]
    HashMismatch {
        id: ModelId,
        expected: String,
        actual: String,
    },

    #[error("Invalid artifact name '{0}'")]
    InvalidName(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fetch worker failed: {0}")]
    Join(String),
}

impl FetchError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Errors raised by a lifecycle hook or by the runner while executing a step.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Directory creation or clearing failed.
    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be retrieved.
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] FetchError),

    /// The configuration document could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The serialized configuration could not be written.
    #[error("Failed to write configuration to {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The container failed to start or exited unsuccessfully.
    #[error("Container failed: {0}")]
    Container(#[from] ContainerError),

    /// The runner was driven into an illegal state.
    #[error(transparent)]
    State(#[from] CoreError),
}

impl TaskError {
    pub(crate) fn filesystem(path: &Path, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A halted pipeline: which step failed, what had completed before it, and why.
#[derive(Debug, Error)]
#[error("Task {task_id} failed at {step} (last completed: {}): {source}", display_step(.last_completed))]
pub struct PipelineError {
    pub task_id: TaskId,
    pub step: TaskStep,
    pub last_completed: Option<TaskStep>,
    #[source]
    pub source: TaskError,
}

fn display_step(step: &Option<TaskStep>) -> &'static str {
    step.map(|s| s.as_str()).unwrap_or("none")
}
