//! Task variants.
//!
//! A variant fills in the bodies of the lifecycle steps; the runner decides
//! when they run and what gets reported.

mod model_task;

use async_trait::async_trait;
use dockrun_core::{ContainerProfile, TaskDescriptor, Workspace};

use crate::error::TaskError;

pub use model_task::ModelTask;

/// What a hook gets to see of the task it runs for.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub descriptor: &'a TaskDescriptor,
    pub workspace: &'a Workspace,
}

/// Hooks a task kind implements.
#[async_trait]
pub trait TaskVariant: Send + Sync {
    /// Short name used in logs and container labels.
    fn name(&self) -> &'static str;

    /// Runtime profile used for the container. Fixed for the variant's lifetime.
    fn container_profile(&self) -> ContainerProfile {
        ContainerProfile::Default
    }

    /// Prepare the workspace directories.
    async fn initialize(&self, ctx: &StepContext<'_>) -> Result<(), TaskError>;

    /// Stage every declared input.
    async fn download(&self, ctx: &StepContext<'_>) -> Result<(), TaskError>;

    /// Last chance to touch the workspace before the container owns it.
    async fn before_main(&self, ctx: &StepContext<'_>) -> Result<(), TaskError>;

    /// Publish results after the container exited.
    async fn upload(&self, ctx: &StepContext<'_>) -> Result<(), TaskError>;
}
