//! JSON-lines reporter for machine-readable progress on stdout.

use std::io::{self, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dockrun_core::{TaskEvent, TaskEventType};
use serde::Serialize;
use tracing::warn;

use super::StepReporter;

/// A JSON line as written by [`JsonLinesReporter`].
#[derive(Debug, Clone, Serialize)]
pub struct JsonEvent<'a> {
    pub event: TaskEventType,
    pub timestamp: String,
    pub task_id: &'a str,
    pub data: serde_json::Value,
}

impl<'a> JsonEvent<'a> {
    fn from_task_event(event: &'a TaskEvent) -> Self {
        let timestamp = Utc
            .timestamp_millis_opt(event.timestamp_ms)
            .single()
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        Self {
            event: event.event_type,
            timestamp,
            task_id: event.task_id.as_str(),
            data: serde_json::json!({
                "step": event.step,
                "metadata": event.metadata,
            }),
        }
    }
}

/// Writes one JSON object per event to a writer (stdout by default).
pub struct JsonLinesReporter<W = io::Stdout> {
    out: Mutex<W>,
}

impl JsonLinesReporter<io::Stdout> {
    /// Reporter writing to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesReporter<W> {
    /// Reporter writing to an arbitrary writer.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consume the reporter and return its writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: &TaskEvent) -> io::Result<()> {
        let line = serde_json::to_string(&JsonEvent::from_task_event(event))?;
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(out, "{}", line)?;
        out.flush()
    }
}

#[async_trait]
impl<W: Write + Send> StepReporter for JsonLinesReporter<W> {
    async fn report(&self, event: &TaskEvent) {
        if let Err(e) = self.emit(event) {
            warn!(task_id = %event.task_id, error = %e, "Failed to write JSON event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockrun_core::{TaskId, TaskStep};

    #[tokio::test]
    async fn test_writes_one_line_per_event() {
        let reporter = JsonLinesReporter::new(Vec::new());
        let task_id = TaskId::new("t-1");

        reporter
            .report(&TaskEvent::step_completed(task_id.clone(), TaskStep::Download))
            .await;
        reporter
            .report(&TaskEvent::task_failed(
                task_id,
                TaskStep::Main,
                Some(TaskStep::Download),
                "exit code 1",
            ))
            .await;

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "step_completed");
        assert_eq!(lines[0]["task_id"], "t-1");
        assert_eq!(lines[0]["data"]["step"], "DOWNLOAD");
        assert_eq!(lines[1]["event"], "task_failed");
        assert_eq!(lines[1]["data"]["metadata"]["last_completed"], "DOWNLOAD");
        assert!(lines[1]["timestamp"].as_str().unwrap().contains('T'));
    }
}
