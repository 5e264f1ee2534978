//! HTTP reporter posting task events to the platform.

use async_trait::async_trait;
use dockrun_core::TaskEvent;
use tracing::{debug, warn};

use super::StepReporter;

/// Posts each event as JSON to `<base_url>/tasks/<task_id>/events`.
pub struct HttpReporter {
    inner: reqwest::Client,
    base_url: String,
}

impl HttpReporter {
    /// Create a new HTTP reporter.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Endpoint events of a task are posted to.
    pub fn events_url(&self, event: &TaskEvent) -> String {
        format!("{}/tasks/{}/events", self.base_url, event.task_id)
    }
}

#[async_trait]
impl StepReporter for HttpReporter {
    async fn report(&self, event: &TaskEvent) {
        let url = self.events_url(event);
        debug!(url = %url, event_type = ?event.event_type, "POST task event");

        match self.inner.post(&url).json(event).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => warn!(
                url = %url,
                status = %response.status(),
                "Platform rejected task event"
            ),
            Err(e) => warn!(url = %url, error = %e, "Failed to deliver task event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockrun_core::{TaskId, TaskStep};

    #[test]
    fn test_events_url() {
        let reporter = HttpReporter::new("http://platform.local/api/");
        let event = TaskEvent::step_completed(TaskId::new("t-9"), TaskStep::Download);
        assert_eq!(
            reporter.events_url(&event),
            "http://platform.local/api/tasks/t-9/events"
        );
    }

    #[tokio::test]
    async fn test_unreachable_platform_does_not_panic() {
        let reporter = HttpReporter::new("http://127.0.0.1:9");
        reporter
            .report(&TaskEvent::task_completed(TaskId::new("t-9")))
            .await;
    }
}
