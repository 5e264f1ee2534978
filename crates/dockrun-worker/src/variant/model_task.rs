//! Training/inference task: a model, project data and a configuration file
//! staged for a GPU container.

use async_trait::async_trait;
use dockrun_core::ContainerProfile;
use futures::future::try_join_all;
use tracing::info;

use super::{StepContext, TaskVariant};
use crate::error::TaskError;
use crate::fetcher::ArtifactFetcher;
use crate::fs;

/// Variant for neural network training and inference images.
pub struct ModelTask<F> {
    fetcher: F,
    profile: ContainerProfile,
}

impl<F: ArtifactFetcher> ModelTask<F> {
    /// Create the variant. Always runs on the GPU runtime.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            profile: ContainerProfile::Nvidia,
        }
    }
}

#[async_trait]
impl<F: ArtifactFetcher> TaskVariant for ModelTask<F> {
    fn name(&self) -> &'static str {
        "model_task"
    }

    fn container_profile(&self) -> ContainerProfile {
        self.profile
    }

    async fn initialize(&self, ctx: &StepContext<'_>) -> Result<(), TaskError> {
        fs::ensure_directory(ctx.workspace.data_dir()).await?;
        fs::ensure_directory(ctx.workspace.results_dir()).await?;
        Ok(())
    }

    async fn download(&self, ctx: &StepContext<'_>) -> Result<(), TaskError> {
        let ws = ctx.workspace;
        let models = ctx.descriptor.models();
        let projects = ctx.descriptor.projects();

        // Models share one directory: fetch in declaration order so a later
        // model's files replace an earlier model's.
        fs::ensure_directory(ws.model_dir()).await?;
        for model in models {
            self.fetcher.fetch_model(model, ws.model_dir()).await?;
        }

        info!(models = models.len(), "Models staged, writing task configuration");
        fs::write_config(ctx.descriptor.config(), &ws.config_paths()).await?;

        try_join_all(projects.iter().map(|project| {
            self.fetcher
                .fetch_project(ws.data_dir(), project, &project.datasets)
        }))
        .await?;

        info!(projects = projects.len(), "Project data staged");
        Ok(())
    }

    async fn before_main(&self, ctx: &StepContext<'_>) -> Result<(), TaskError> {
        fs::clear_directory(ctx.workspace.results_dir()).await
    }

    async fn upload(&self, _ctx: &StepContext<'_>) -> Result<(), TaskError> {
        // Results are collected from the results directory by the platform.
        Ok(())
    }
}
