//! Launcher trait implemented by container engines.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ContainerError;
use crate::spec::ContainerSpec;

/// Outcome of a container that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerExit {
    /// Exit code reported by the engine.
    pub exit_code: i32,

    /// Wall-clock time from spawn to exit.
    pub duration: Duration,
}

/// Runs a container and waits for it to exit.
///
/// Implementations return `Ok` only for a clean (zero) exit; any other
/// outcome is a [`ContainerError`].
#[async_trait]
pub trait ContainerLauncher: Send + Sync {
    async fn launch(&self, spec: &ContainerSpec) -> Result<ContainerExit, ContainerError>;
}
