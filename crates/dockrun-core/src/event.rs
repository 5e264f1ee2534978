//! Task lifecycle events forwarded to reporters.

use crate::{TaskId, TaskStep};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A lifecycle event of a single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Task this event belongs to.
    pub task_id: TaskId,
    /// Type of event.
    pub event_type: TaskEventType,
    /// Step the event refers to, if any.
    pub step: Option<TaskStep>,
    /// Unix timestamp (milliseconds) when event occurred.
    pub timestamp_ms: i64,
    /// Event-specific metadata (error, last completed step, etc.).
    pub metadata: HashMap<String, String>,
}

impl TaskEvent {
    /// Create a new task event.
    pub fn new(
        task_id: TaskId,
        event_type: TaskEventType,
        step: Option<TaskStep>,
        metadata: HashMap<String, String>,
    ) -> Self {
        Self {
            task_id,
            event_type,
            step,
            timestamp_ms: Utc::now().timestamp_millis(),
            metadata,
        }
    }

    /// Create a StepCompleted event.
    pub fn step_completed(task_id: TaskId, step: TaskStep) -> Self {
        Self::new(
            task_id,
            TaskEventType::StepCompleted,
            Some(step),
            HashMap::new(),
        )
    }

    /// Create a TaskCompleted event.
    pub fn task_completed(task_id: TaskId) -> Self {
        Self::new(task_id, TaskEventType::TaskCompleted, None, HashMap::new())
    }

    /// Create a TaskFailed event for the step that failed.
    pub fn task_failed(
        task_id: TaskId,
        failed_step: TaskStep,
        last_completed: Option<TaskStep>,
        error: impl Into<String>,
    ) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("error".to_string(), error.into());
        if let Some(step) = last_completed {
            metadata.insert("last_completed".to_string(), step.to_string());
        }
        Self::new(task_id, TaskEventType::TaskFailed, Some(failed_step), metadata)
    }
}

/// Type of task event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventType {
    /// A pipeline step finished successfully.
    StepCompleted,
    /// The whole pipeline finished.
    TaskCompleted,
    /// A step failed and the pipeline halted.
    TaskFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_completed() {
        let task_id = TaskId::generate();
        let event = TaskEvent::step_completed(task_id.clone(), TaskStep::Download);

        assert_eq!(event.task_id, task_id);
        assert_eq!(event.event_type, TaskEventType::StepCompleted);
        assert_eq!(event.step, Some(TaskStep::Download));
        assert!(event.timestamp_ms > 0);
    }

    #[test]
    fn test_task_failed() {
        let event = TaskEvent::task_failed(
            TaskId::new("t"),
            TaskStep::Main,
            Some(TaskStep::Download),
            "exit code 3",
        );

        assert_eq!(event.event_type, TaskEventType::TaskFailed);
        assert_eq!(event.step, Some(TaskStep::Main));
        assert_eq!(event.metadata.get("error"), Some(&"exit code 3".to_string()));
        assert_eq!(
            event.metadata.get("last_completed"),
            Some(&"DOWNLOAD".to_string())
        );
    }

    #[test]
    fn test_failed_before_any_step_has_no_last_completed() {
        let event = TaskEvent::task_failed(TaskId::new("t"), TaskStep::Initialize, None, "eacces");
        assert!(!event.metadata.contains_key("last_completed"));
    }
}
