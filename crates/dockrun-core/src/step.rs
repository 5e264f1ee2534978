//! Pipeline steps and lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// A reportable pipeline step. Variants are declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStep {
    /// Workspace directories created.
    Initialize,
    /// Models, data and configuration staged.
    Download,
    /// Container ran to a clean exit.
    Main,
    /// Results published.
    Upload,
}

impl TaskStep {
    /// All steps in execution order.
    pub const ALL: [TaskStep; 4] = [
        TaskStep::Initialize,
        TaskStep::Download,
        TaskStep::Main,
        TaskStep::Upload,
    ];

    /// Wire name of the step.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "INITIALIZE",
            Self::Download => "DOWNLOAD",
            Self::Main => "MAIN",
            Self::Upload => "UPLOAD",
        }
    }
}

impl fmt::Display for TaskStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a task inside the lifecycle runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Nothing has run yet.
    #[default]
    Init,
    /// Workspace initialized, inputs being staged.
    Downloading,
    /// Inputs staged, container not started.
    ReadyToRun,
    /// Container running.
    Running,
    /// Container exited cleanly, results being published.
    Uploading,
    /// Pipeline completed.
    Done,
    /// A step failed. Absorbing.
    Failed,
}

impl LifecycleState {
    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// The step whose success moves the task out of this state.
    pub fn pending_step(&self) -> Option<TaskStep> {
        match self {
            Self::Init => Some(TaskStep::Initialize),
            Self::Downloading => Some(TaskStep::Download),
            Self::ReadyToRun | Self::Running => Some(TaskStep::Main),
            Self::Uploading => Some(TaskStep::Upload),
            Self::Done | Self::Failed => None,
        }
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(&self, to: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, to) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Init, Downloading)
            | (Downloading, ReadyToRun)
            | (ReadyToRun, Running)
            | (Running, Uploading)
            | (Uploading, Done) => true,
            _ => false,
        }
    }

    /// Validate and return the new state.
    pub fn transition(self, to: LifecycleState) -> Result<LifecycleState, CoreError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidStateTransition { from: self, to })
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Downloading => "DOWNLOADING",
            Self::ReadyToRun => "READY_TO_RUN",
            Self::Running => "RUNNING",
            Self::Uploading => "UPLOADING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}
