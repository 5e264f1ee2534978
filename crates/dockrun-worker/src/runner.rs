//! Task lifecycle runner.
//!
//! The runner owns the step order (INITIALIZE, DOWNLOAD, MAIN, UPLOAD), the
//! lifecycle state, container invocation and reporting. A [`TaskVariant`]
//! only supplies the step bodies.
//!
//! A step is reported after it succeeded and never otherwise. The first
//! failing step moves the task to FAILED and nothing after it runs.

use std::path::PathBuf;

use dockrun_container::{ContainerLauncher, ContainerSpec};
use dockrun_core::{LifecycleState, TaskDescriptor, TaskEvent, TaskId, TaskStep, Workspace};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument, Span};

use crate::error::{PipelineError, TaskError};
use crate::fs;
use crate::reporter::StepReporter;
use crate::variant::{StepContext, TaskVariant};

/// What happens to the task root once the pipeline stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Leave the workspace in place for inspection.
    #[default]
    Keep,
    /// Delete the task root.
    Remove,
}

/// Container settings the runner applies to every task it launches.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerOptions {
    /// Image to run.
    pub image: String,
    /// Where the task root is mounted inside the container.
    pub mount_point: PathBuf,
    /// Command overriding the image default.
    pub command: Vec<String>,
    /// Extra environment for the container.
    pub env: Vec<(String, String)>,
    /// Workspace teardown policy.
    pub cleanup: CleanupPolicy,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            image: String::new(),
            mount_point: PathBuf::from(dockrun_core::workspace::DEFAULT_MOUNT_POINT),
            command: Vec::new(),
            env: Vec::new(),
            cleanup: CleanupPolicy::Keep,
        }
    }
}

/// Where a finished run ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub task_id: TaskId,
    pub state: LifecycleState,
    pub last_completed: Option<TaskStep>,
}

/// Drives one task through its lifecycle.
pub struct LifecycleRunner<V, L, R> {
    descriptor: TaskDescriptor,
    workspace: Workspace,
    variant: V,
    launcher: L,
    reporter: R,
    options: RunnerOptions,
    state: LifecycleState,
    last_completed: Option<TaskStep>,
    span: Span,
}

impl<V, L, R> LifecycleRunner<V, L, R>
where
    V: TaskVariant,
    L: ContainerLauncher,
    R: StepReporter,
{
    /// Create a runner for a task. The workspace is derived from the
    /// descriptor's root.
    pub fn new(
        descriptor: TaskDescriptor,
        variant: V,
        launcher: L,
        reporter: R,
        options: RunnerOptions,
    ) -> Self {
        let workspace =
            Workspace::new(descriptor.root()).with_mount_point(options.mount_point.clone());
        let span = info_span!(
            "task",
            task_id = %descriptor.task_id(),
            variant = variant.name()
        );
        Self {
            descriptor,
            workspace,
            variant,
            launcher,
            reporter,
            options,
            state: LifecycleState::Init,
            last_completed: None,
            span,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn last_completed(&self) -> Option<TaskStep> {
        self.last_completed
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn task_id(&self) -> &TaskId {
        self.descriptor.task_id()
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            task_id: self.descriptor.task_id().clone(),
            state: self.state,
            last_completed: self.last_completed,
        }
    }

    /// Execute the next pending step.
    ///
    /// Returns the state after the step. Terminal states are returned as-is
    /// without doing anything.
    pub async fn advance(&mut self) -> Result<LifecycleState, PipelineError> {
        let Some(step) = self.state.pending_step() else {
            return Ok(self.state);
        };

        let span = self.span.clone();
        match self.execute(step).instrument(span.clone()).await {
            Ok(()) => {
                self.last_completed = Some(step);
                let task_id = self.descriptor.task_id().clone();
                self.reporter
                    .report(&TaskEvent::step_completed(task_id.clone(), step))
                    .instrument(span.clone())
                    .await;
                if self.state == LifecycleState::Done {
                    self.reporter
                        .report(&TaskEvent::task_completed(task_id))
                        .instrument(span)
                        .await;
                }
                Ok(self.state)
            }
            Err(source) => {
                // Every non-terminal state may move to FAILED.
                self.state = LifecycleState::Failed;
                let event = TaskEvent::task_failed(
                    self.descriptor.task_id().clone(),
                    step,
                    self.last_completed,
                    source.to_string(),
                );
                self.reporter.report(&event).instrument(span).await;
                Err(PipelineError {
                    task_id: self.descriptor.task_id().clone(),
                    step,
                    last_completed: self.last_completed,
                    source,
                })
            }
        }
    }

    /// Run steps until `step` has completed (or the pipeline is done).
    pub async fn run_until(&mut self, step: TaskStep) -> Result<RunSummary, PipelineError> {
        while !self.state.is_terminal() && self.last_completed < Some(step) {
            self.advance().await?;
        }
        Ok(self.summary())
    }

    /// Run the whole pipeline, then apply the cleanup policy.
    pub async fn run(mut self) -> Result<RunSummary, PipelineError> {
        let result = self.run_until(TaskStep::Upload).await;
        self.cleanup().await;
        result
    }

    async fn execute(&mut self, step: TaskStep) -> Result<(), TaskError> {
        info!(step = %step, state = %self.state, "Starting step");
        let ctx = StepContext {
            descriptor: &self.descriptor,
            workspace: &self.workspace,
        };

        match step {
            TaskStep::Initialize => {
                self.variant.initialize(&ctx).await?;
                self.state = self.state.transition(LifecycleState::Downloading)?;
            }
            TaskStep::Download => {
                self.variant.download(&ctx).await?;
                self.state = self.state.transition(LifecycleState::ReadyToRun)?;
            }
            TaskStep::Main => {
                self.variant.before_main(&ctx).await?;
                let spec = self.container_spec();
                self.state = self.state.transition(LifecycleState::Running)?;
                let exit = self.launcher.launch(&spec).await?;
                info!(
                    container = %spec.name,
                    duration_ms = exit.duration.as_millis() as u64,
                    "Container finished"
                );
                self.state = self.state.transition(LifecycleState::Uploading)?;
            }
            TaskStep::Upload => {
                self.variant.upload(&ctx).await?;
                self.state = self.state.transition(LifecycleState::Done)?;
            }
        }

        info!(step = %step, state = %self.state, "Step completed");
        Ok(())
    }

    fn container_spec(&self) -> ContainerSpec {
        let task_id = self.descriptor.task_id();
        let mut spec = ContainerSpec::new(format!("dockrun-{}", task_id), &self.options.image)
            .with_profile(self.variant.container_profile())
            .with_mount(self.workspace.root(), self.workspace.mount_point())
            .with_env("TASK_ID", task_id.as_str())
            .with_command(self.options.command.iter().cloned());
        for (key, value) in &self.options.env {
            spec = spec.with_env(key.clone(), value.clone());
        }
        spec
    }

    async fn cleanup(&self) {
        if self.options.cleanup != CleanupPolicy::Remove {
            return;
        }
        let root = self.workspace.root();
        match fs::remove_tree(root).await {
            Ok(()) => info!(parent: &self.span, root = %root.display(), "Workspace removed"),
            Err(e) => warn!(parent: &self.span, error = %e, "Failed to remove workspace"),
        }
    }
}
