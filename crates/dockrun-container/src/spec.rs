//! Description of a container to run.

use std::path::PathBuf;

use dockrun_core::ContainerProfile;

/// Everything the launcher needs to start one task container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    /// Container name.
    pub name: String,

    /// Image reference.
    pub image: String,

    /// Runtime profile.
    pub profile: ContainerProfile,

    /// Bind mounts as (host path, container path).
    pub mounts: Vec<(PathBuf, PathBuf)>,

    /// Environment variables.
    pub env: Vec<(String, String)>,

    /// Command overriding the image entrypoint arguments.
    pub command: Vec<String>,
}

impl ContainerSpec {
    /// Create a spec for the given container name and image.
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            profile: ContainerProfile::Default,
            mounts: Vec::new(),
            env: Vec::new(),
            command: Vec::new(),
        }
    }

    /// Set the runtime profile.
    pub fn with_profile(mut self, profile: ContainerProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Add a bind mount.
    pub fn with_mount(mut self, host: impl Into<PathBuf>, container: impl Into<PathBuf>) -> Self {
        self.mounts.push((host.into(), container.into()));
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the command.
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }
}
