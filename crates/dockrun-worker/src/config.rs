//! Worker configuration.

use std::path::PathBuf;

use clap::ValueEnum;
use dockrun_core::workspace::DEFAULT_MOUNT_POINT;

use crate::runner::{CleanupPolicy, RunnerOptions};

/// Where step events go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReporterKind {
    /// Structured log lines.
    #[default]
    Log,
    /// JSON lines on stdout.
    Json,
    /// POST to the platform.
    Http,
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory under which each task gets its root (`<tasks_dir>/<task_id>`).
    pub tasks_dir: PathBuf,

    /// Artifact store the fetcher serves from.
    pub artifact_store: PathBuf,

    /// Image to run task containers from.
    pub image: String,

    /// Path to the docker CLI.
    pub docker_path: String,

    /// Mount point of the task root inside the container.
    pub mount_point: PathBuf,

    /// Reporter for step events.
    pub reporter: ReporterKind,

    /// Platform base URL for the HTTP reporter.
    pub report_url: Option<String>,

    /// Maximum tasks running at once.
    pub max_concurrent_tasks: usize,

    /// Workspace teardown policy.
    pub cleanup: CleanupPolicy,

    /// Keep exited containers instead of removing them.
    pub keep_containers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tasks_dir: PathBuf::from("/var/lib/dockrun/tasks"),
            artifact_store: PathBuf::from("/var/lib/dockrun/store"),
            image: String::new(),
            docker_path: "docker".to_string(),
            mount_point: PathBuf::from(DEFAULT_MOUNT_POINT),
            reporter: ReporterKind::Log,
            report_url: None,
            max_concurrent_tasks: 2,
            cleanup: CleanupPolicy::Keep,
            keep_containers: false,
        }
    }
}

impl Config {
    /// Root directory of a task.
    pub fn task_root(&self, task_id: &dockrun_core::TaskId) -> PathBuf {
        self.tasks_dir.join(task_id.as_str())
    }

    /// Runner options derived from this configuration.
    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            image: self.image.clone(),
            mount_point: self.mount_point.clone(),
            cleanup: self.cleanup,
            ..RunnerOptions::default()
        }
    }

    /// Check settings that depend on each other.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_tasks == 0 {
            return Err("max_concurrent_tasks must be at least 1".to_string());
        }
        if self.reporter == ReporterKind::Http && self.report_url.is_none() {
            return Err("the http reporter needs --report-url".to_string());
        }
        Ok(())
    }
}
