//! dockrun worker daemon

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dockrun_container::DockerLauncher;
use dockrun_core::{TaskDescriptor, TaskInfo, TaskStep};
use dockrun_worker::{
    CleanupPolicy, Config, HttpReporter, JsonLinesReporter, LifecycleRunner, LocalArtifactFetcher,
    LogReporter, ModelTask, ReporterKind, StepReporter,
};

/// dockrun worker - stage, run and collect dockerized tasks
#[derive(Parser)]
#[command(name = "dockrun-worker")]
#[command(about = "Runs dockerized model tasks", long_about = None)]
struct Cli {
    /// Directory holding task workspaces
    #[arg(long)]
    tasks_dir: Option<PathBuf>,

    /// Artifact store to fetch models and datasets from
    #[arg(long)]
    artifact_store: Option<PathBuf>,

    /// Image to run task containers from
    #[arg(long)]
    image: Option<String>,

    /// Path to the docker CLI
    #[arg(long)]
    docker_path: Option<String>,

    /// Mount point of the task root inside the container
    #[arg(long)]
    mount_point: Option<PathBuf>,

    /// Where step events are reported
    #[arg(long, value_enum)]
    reporter: Option<ReporterKind>,

    /// Platform base URL for the http reporter
    #[arg(long)]
    report_url: Option<String>,

    /// Maximum number of tasks running at once
    #[arg(long)]
    max_concurrent_tasks: Option<usize>,

    /// What to do with a workspace once its task stops
    #[arg(long, value_enum)]
    cleanup: Option<CleanupPolicy>,

    /// Keep exited containers for inspection
    #[arg(long)]
    keep_containers: bool,

    /// Shorthand for --reporter json
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for one or more tasks
    Run {
        /// Task info JSON files
        #[arg(required = true)]
        tasks: Vec<PathBuf>,
    },

    /// Stage a task's workspace (initialize + download) without running it
    Stage {
        /// Task info JSON file
        task: PathBuf,
    },
}

impl Cli {
    fn config(&self) -> Config {
        let defaults = Config::default();
        Config {
            tasks_dir: self.tasks_dir.clone().unwrap_or(defaults.tasks_dir),
            artifact_store: self.artifact_store.clone().unwrap_or(defaults.artifact_store),
            image: self.image.clone().unwrap_or(defaults.image),
            docker_path: self.docker_path.clone().unwrap_or(defaults.docker_path),
            mount_point: self.mount_point.clone().unwrap_or(defaults.mount_point),
            reporter: if self.json {
                ReporterKind::Json
            } else {
                self.reporter.unwrap_or(defaults.reporter)
            },
            report_url: self.report_url.clone().or(defaults.report_url),
            max_concurrent_tasks: self
                .max_concurrent_tasks
                .unwrap_or(defaults.max_concurrent_tasks),
            cleanup: self.cleanup.unwrap_or(defaults.cleanup),
            keep_containers: self.keep_containers,
        }
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

type Runner =
    LifecycleRunner<ModelTask<Arc<LocalArtifactFetcher>>, DockerLauncher, Arc<dyn StepReporter>>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Logs go to stderr so JSON events on stdout stay parseable.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = Arc::new(cli.config());
    config.validate()?;

    info!(
        tasks_dir = %config.tasks_dir.display(),
        artifact_store = %config.artifact_store.display(),
        image = %config.image,
        reporter = ?config.reporter,
        "Starting dockrun worker"
    );

    let reporter = build_reporter(&config);
    let fetcher = Arc::new(LocalArtifactFetcher::new(&config.artifact_store));

    match cli.command {
        Commands::Run { tasks } => run_tasks(config, fetcher, reporter, tasks).await,
        Commands::Stage { task } => {
            let mut runner = build_runner(&config, fetcher, reporter, &task).await?;
            let summary = runner.run_until(TaskStep::Download).await?;
            info!(
                task_id = %summary.task_id,
                root = %runner.workspace().root().display(),
                "Workspace staged"
            );
            Ok(())
        }
    }
}

fn build_reporter(config: &Config) -> Arc<dyn StepReporter> {
    match (config.reporter, config.report_url.as_deref()) {
        (ReporterKind::Json, _) => Arc::new(JsonLinesReporter::stdout()),
        (ReporterKind::Http, Some(url)) => Arc::new(HttpReporter::new(url)),
        // validate() rejects http without a URL
        (ReporterKind::Http, None) | (ReporterKind::Log, _) => Arc::new(LogReporter),
    }
}

async fn load_descriptor(
    config: &Config,
    path: &Path,
) -> Result<TaskDescriptor, BoxError> {
    let json = tokio::fs::read_to_string(path).await?;
    let info = TaskInfo::from_json(&json)?;
    let task_id = info.task_id.clone().unwrap_or_else(dockrun_core::TaskId::generate);
    let root = config.task_root(&task_id);
    Ok(TaskInfo {
        task_id: Some(task_id),
        ..info
    }
    .into_descriptor(root))
}

async fn build_runner(
    config: &Config,
    fetcher: Arc<LocalArtifactFetcher>,
    reporter: Arc<dyn StepReporter>,
    path: &Path,
) -> Result<Runner, BoxError> {
    let descriptor = load_descriptor(config, path).await?;
    info!(
        task_id = %descriptor.task_id(),
        file = %path.display(),
        models = descriptor.models().len(),
        projects = descriptor.projects().len(),
        "Loaded task"
    );

    let mut launcher = DockerLauncher::new(config.docker_path.clone());
    if config.keep_containers {
        launcher = launcher.keep_containers();
    }

    Ok(LifecycleRunner::new(
        descriptor,
        ModelTask::new(fetcher),
        launcher,
        reporter,
        config.runner_options(),
    ))
}

async fn run_tasks(
    config: Arc<Config>,
    fetcher: Arc<LocalArtifactFetcher>,
    reporter: Arc<dyn StepReporter>,
    tasks: Vec<PathBuf>,
) -> Result<(), BoxError> {
    let permits = Arc::new(Semaphore::new(config.max_concurrent_tasks));
    let mut set = JoinSet::new();
    let total = tasks.len();

    for path in tasks {
        let config = config.clone();
        let fetcher = fetcher.clone();
        let reporter = reporter.clone();
        let permits = permits.clone();

        set.spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let runner = build_runner(&config, fetcher, reporter, &path).await?;
            runner.run().await?;
            Ok::<_, BoxError>(())
        });
    }

    let mut failed = 0usize;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failed += 1;
                error!(error = %e, "Task failed");
            }
            Err(e) => {
                failed += 1;
                error!(error = %e, "Task worker panicked");
            }
        }
    }

    info!(total = total, failed = failed, "All tasks finished");
    if failed > 0 {
        return Err(format!("{} of {} tasks failed", failed, total).into());
    }
    Ok(())
}
