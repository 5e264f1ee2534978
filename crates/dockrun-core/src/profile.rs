//! Container execution profile.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime selector handed to the container launcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerProfile {
    /// Whatever runtime the daemon is configured with.
    #[default]
    Default,
    /// GPU-enabled NVIDIA runtime.
    Nvidia,
}

impl ContainerProfile {
    /// Runtime name to pass to the container engine, if the profile needs one.
    pub fn runtime(&self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Nvidia => Some("nvidia"),
        }
    }
}

impl fmt::Display for ContainerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Nvidia => f.write_str("nvidia"),
        }
    }
}
