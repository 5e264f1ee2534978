//! dockrun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Filesystem or network IO
//! - Container runtimes
//! - Async runtime specifics
//!
//! All types here describe a dockerized task: what it consumes, where it
//! stages its files and which lifecycle steps it moves through.

pub mod descriptor;
pub mod error;
pub mod event;
pub mod ids;
pub mod profile;
pub mod step;
pub mod workspace;

// Re-export commonly used types
pub use descriptor::{DatasetRef, ModelRef, ProjectRef, TaskDescriptor, TaskInfo};
pub use error::CoreError;
pub use event::{TaskEvent, TaskEventType};
pub use ids::{DatasetId, ModelId, ProjectId, TaskId};
pub use profile::ContainerProfile;
pub use step::{LifecycleState, TaskStep};
pub use workspace::Workspace;
