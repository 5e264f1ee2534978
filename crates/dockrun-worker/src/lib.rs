//! dockrun worker.
//!
//! Stages a task's inputs into its workspace, runs the task container and
//! reports each lifecycle step. The [`runner::LifecycleRunner`] owns the
//! sequencing; [`variant::TaskVariant`] implementations fill in the steps.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod fs;
pub mod reporter;
pub mod runner;
pub mod variant;

pub use config::{Config, ReporterKind};
pub use error::{FetchError, PipelineError, TaskError};
pub use fetcher::{ArtifactFetcher, LocalArtifactFetcher};
pub use reporter::{ChannelReporter, HttpReporter, JsonLinesReporter, LogReporter, StepReporter};
pub use runner::{CleanupPolicy, LifecycleRunner, RunSummary, RunnerOptions};
pub use variant::{ModelTask, StepContext, TaskVariant};
