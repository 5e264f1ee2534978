//! Step reporters.
//!
//! The lifecycle runner forwards every [`TaskEvent`] to a [`StepReporter`].
//! Reporting is fire-and-forget: a reporter that cannot deliver an event logs
//! the problem and moves on, it never fails the task.

mod http;
mod json;

use std::sync::Arc;

use async_trait::async_trait;
use dockrun_core::{TaskEvent, TaskEventType};
use tokio::sync::mpsc;
use tracing::{error, info, trace};

pub use http::HttpReporter;
pub use json::JsonLinesReporter;

/// Receives lifecycle events of a task.
#[async_trait]
pub trait StepReporter: Send + Sync {
    async fn report(&self, event: &TaskEvent);
}

#[async_trait]
impl<R: StepReporter + ?Sized> StepReporter for Arc<R> {
    async fn report(&self, event: &TaskEvent) {
        (**self).report(event).await
    }
}

#[async_trait]
impl<R: StepReporter + ?Sized> StepReporter for Box<R> {
    async fn report(&self, event: &TaskEvent) {
        (**self).report(event).await
    }
}

/// Reporter that writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

#[async_trait]
impl StepReporter for LogReporter {
    async fn report(&self, event: &TaskEvent) {
        match event.event_type {
            TaskEventType::StepCompleted => info!(
                task_id = %event.task_id,
                step = ?event.step,
                "Step completed"
            ),
            TaskEventType::TaskCompleted => info!(task_id = %event.task_id, "Task completed"),
            TaskEventType::TaskFailed => error!(
                task_id = %event.task_id,
                step = ?event.step,
                error = ?event.metadata.get("error"),
                last_completed = ?event.metadata.get("last_completed"),
                "Task failed"
            ),
        }
    }
}

/// Reporter that forwards events over an unbounded channel.
///
/// Useful when the worker is embedded in a larger process that wants to
/// observe task progress.
pub struct ChannelReporter {
    event_tx: mpsc::UnboundedSender<TaskEvent>,
}

impl ChannelReporter {
    /// Create a reporter and the receiver for its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { event_tx: tx }, rx)
    }
}

#[async_trait]
impl StepReporter for ChannelReporter {
    async fn report(&self, event: &TaskEvent) {
        // Receiver might be dropped
        if self.event_tx.send(event.clone()).is_err() {
            trace!(task_id = %event.task_id, "Event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockrun_core::{TaskId, TaskStep};

    #[tokio::test]
    async fn test_channel_reporter_forwards_in_order() {
        let (reporter, mut rx) = ChannelReporter::new();
        let task_id = TaskId::new("t-1");

        reporter
            .report(&TaskEvent::step_completed(task_id.clone(), TaskStep::Initialize))
            .await;
        reporter
            .report(&TaskEvent::step_completed(task_id.clone(), TaskStep::Download))
            .await;

        assert_eq!(rx.try_recv().unwrap().step, Some(TaskStep::Initialize));
        assert_eq!(rx.try_recv().unwrap().step, Some(TaskStep::Download));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_channel_reporter_survives_dropped_receiver() {
        let (reporter, rx) = ChannelReporter::new();
        drop(rx);
        reporter
            .report(&TaskEvent::task_completed(TaskId::new("t-1")))
            .await;
    }

    #[tokio::test]
    async fn test_boxed_reporter() {
        let (reporter, mut rx) = ChannelReporter::new();
        let boxed: Box<dyn StepReporter> = Box::new(reporter);
        boxed
            .report(&TaskEvent::task_completed(TaskId::new("t-1")))
            .await;
        assert_eq!(rx.try_recv().unwrap().event_type, TaskEventType::TaskCompleted);
    }
}
