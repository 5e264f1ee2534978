//! Per-task directory layout.
//!
//! Every name here is part of the contract with the container images: they
//! look for their inputs and write their outputs at these exact locations.

use std::path::{Path, PathBuf};

/// Input data directory name.
pub const DATA_DIR: &str = "data";
/// Output directory name.
pub const RESULTS_DIR: &str = "results";
/// Model artifact directory name.
pub const MODEL_DIR: &str = "model";
/// Legacy configuration file, still read by older images.
pub const LEGACY_CONFIG_FILE: &str = "task_settings.json";
/// Current configuration file.
pub const CONFIG_FILE: &str = "task_config.json";
/// Where the task root is mounted inside the container.
pub const DEFAULT_MOUNT_POINT: &str = "/sly_task_data";

/// Paths derived from a task root. Computed once per task and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    data: PathBuf,
    results: PathBuf,
    model: PathBuf,
    legacy_config: PathBuf,
    config: PathBuf,
    mount_point: PathBuf,
}

impl Workspace {
    /// Derive the layout for a task root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data: root.join(DATA_DIR),
            results: root.join(RESULTS_DIR),
            model: root.join(MODEL_DIR),
            legacy_config: root.join(LEGACY_CONFIG_FILE),
            config: root.join(CONFIG_FILE),
            mount_point: PathBuf::from(DEFAULT_MOUNT_POINT),
            root,
        }
    }

    /// Builder method to override the in-container mount point.
    pub fn with_mount_point(mut self, mount_point: impl Into<PathBuf>) -> Self {
        self.mount_point = mount_point.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> &Path {
        &self.data
    }

    pub fn results_dir(&self) -> &Path {
        &self.results
    }

    pub fn model_dir(&self) -> &Path {
        &self.model
    }

    pub fn legacy_config_path(&self) -> &Path {
        &self.legacy_config
    }

    pub fn config_path(&self) -> &Path {
        &self.config
    }

    /// Both configuration paths, legacy first. They are always written
    /// together.
    pub fn config_paths(&self) -> [&Path; 2] {
        [self.legacy_config.as_path(), self.config.as_path()]
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }
}
