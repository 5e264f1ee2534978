//! Container launch for dockrun
//!
//! This crate runs a task's container and waits for it to exit. The lifecycle
//! runner only sees the [`ContainerLauncher`] trait; [`DockerLauncher`] is the
//! implementation that drives the `docker` CLI.
//!
//! # Example
//!
//! ```rust,no_run
//! use dockrun_container::{ContainerLauncher, ContainerSpec, DockerLauncher};
//! use dockrun_core::ContainerProfile;
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let launcher = DockerLauncher::new("docker");
//!     let spec = ContainerSpec::new("task-42", "registry.local/train:latest")
//!         .with_profile(ContainerProfile::Nvidia)
//!         .with_mount("/var/tasks/42", "/sly_task_data");
//!
//!     let exit = launcher.launch(&spec).await?;
//!     println!("exited after {:?}", exit.duration);
//!     Ok(())
//! }
//! ```

mod docker;
mod error;
mod launcher;
mod spec;

pub use docker::DockerLauncher;
pub use error::ContainerError;
pub use launcher::{ContainerExit, ContainerLauncher};
pub use spec::ContainerSpec;
