//! Docker CLI launcher.
//!
//! Runs task containers with `docker run` in the foreground, forwarding the
//! container's stdout/stderr to the log line by line.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::ContainerError;
use crate::launcher::{ContainerExit, ContainerLauncher};
use crate::spec::ContainerSpec;

/// Launcher backed by the `docker` command line client.
#[derive(Debug, Clone)]
pub struct DockerLauncher {
    /// Path to the docker executable.
    docker_path: String,

    /// Remove the container once it exits.
    auto_remove: bool,
}

impl DockerLauncher {
    /// Create a launcher with the given path to the docker CLI.
    ///
    /// The path can be just "docker" to use PATH lookup, or a full path.
    pub fn new(docker_path: impl Into<String>) -> Self {
        Self {
            docker_path: docker_path.into(),
            auto_remove: true,
        }
    }

    /// Keep exited containers around for inspection.
    pub fn keep_containers(mut self) -> Self {
        self.auto_remove = false;
        self
    }

    /// Arguments passed to the docker CLI for a spec.
    pub fn command_args(&self, spec: &ContainerSpec) -> Result<Vec<String>, ContainerError> {
        if spec.image.trim().is_empty() {
            return Err(ContainerError::InvalidSpec("image is empty".to_string()));
        }

        let mut args = vec!["run".to_string()];
        if self.auto_remove {
            args.push("--rm".to_string());
        }
        args.push("--name".to_string());
        args.push(spec.name.clone());

        if let Some(runtime) = spec.profile.runtime() {
            args.push("--runtime".to_string());
            args.push(runtime.to_string());
        }

        for (host, container) in &spec.mounts {
            args.push("-v".to_string());
            args.push(format!("{}:{}", host.display(), container.display()));
        }

        for (key, value) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        args.push(spec.image.clone());
        args.extend(spec.command.iter().cloned());
        Ok(args)
    }
}

impl Default for DockerLauncher {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl ContainerLauncher for DockerLauncher {
    async fn launch(&self, spec: &ContainerSpec) -> Result<ContainerExit, ContainerError> {
        let args = self.command_args(spec)?;

        info!(
            container = %spec.name,
            image = %spec.image,
            profile = %spec.profile,
            "Starting container"
        );
        debug!(docker_path = %self.docker_path, args = ?args, "Full command");

        let mut cmd = Command::new(&self.docker_path);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            error!(error = %e, docker_path = %self.docker_path, "Failed to spawn docker");
            if e.kind() == std::io::ErrorKind::NotFound {
                ContainerError::EngineNotFound(self.docker_path.clone())
            } else {
                ContainerError::SpawnError(e)
            }
        })?;

        let stdout = child.stdout.take().map(|s| forward_lines(s, spec.name.clone(), false));
        let stderr = child.stderr.take().map(|s| forward_lines(s, spec.name.clone(), true));

        let status = child.wait().await?;

        // Drain the readers so the tail of the container log is not lost.
        for reader in [stdout, stderr].into_iter().flatten() {
            let _ = reader.await;
        }

        let duration = started.elapsed();
        info!(
            container = %spec.name,
            success = status.success(),
            exit_code = ?status.code(),
            duration_ms = duration.as_millis() as u64,
            "Container exited"
        );

        match status.code() {
            Some(0) => Ok(ContainerExit {
                exit_code: 0,
                duration,
            }),
            Some(code) => Err(ContainerError::NonZeroExit {
                name: spec.name.clone(),
                code,
            }),
            None => Err(ContainerError::Terminated(spec.name.clone())),
        }
    }
}

/// Forward each line of a container stream to the log.
fn forward_lines<R>(stream: R, container: String, is_stderr: bool) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let trimmed = line.trim_end();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if is_stderr {
                        warn!(container = %container, stderr = %trimmed, "Container stderr");
                    } else {
                        info!(container = %container, stdout = %trimmed, "Container stdout");
                    }
                }
                Err(e) => {
                    error!(container = %container, error = %e, "Error reading container output");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockrun_core::ContainerProfile;

    fn gpu_spec() -> ContainerSpec {
        ContainerSpec::new("task-42", "train:latest")
            .with_profile(ContainerProfile::Nvidia)
            .with_mount("/var/tasks/42", "/sly_task_data")
            .with_env("TASK_ID", "42")
    }

    #[test]
    fn test_gpu_command_args() {
        let launcher = DockerLauncher::new("docker");
        let args = launcher.command_args(&gpu_spec()).unwrap();

        assert_eq!(
            args,
            vec![
                "run",
                "--rm",
                "--name",
                "task-42",
                "--runtime",
                "nvidia",
                "-v",
                "/var/tasks/42:/sly_task_data",
                "-e",
                "TASK_ID=42",
                "train:latest",
            ]
        );
    }

    #[test]
    fn test_default_profile_has_no_runtime_flag() {
        let launcher = DockerLauncher::default().keep_containers();
        let spec = ContainerSpec::new("c", "img").with_command(["python", "train.py"]);
        let args = launcher.command_args(&spec).unwrap();

        assert!(!args.iter().any(|a| a == "--runtime"));
        assert!(!args.iter().any(|a| a == "--rm"));
        assert_eq!(&args[args.len() - 3..], &["img", "python", "train.py"]);
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let launcher = DockerLauncher::default();
        let result = launcher.command_args(&ContainerSpec::new("c", " "));
        assert!(matches!(result, Err(ContainerError::InvalidSpec(_))));
    }

    #[tokio::test]
    async fn test_clean_exit() {
        // `true` ignores its arguments and exits 0, standing in for docker.
        let launcher = DockerLauncher::new("true");
        let exit = launcher.launch(&gpu_spec()).await.unwrap();
        assert_eq!(exit.exit_code, 0);
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let launcher = DockerLauncher::new("false");
        let result = launcher.launch(&gpu_spec()).await;
        assert!(matches!(
            result,
            Err(ContainerError::NonZeroExit { code: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_engine() {
        let launcher = DockerLauncher::new("/nonexistent/docker-binary");
        let result = launcher.launch(&gpu_spec()).await;
        assert!(matches!(result, Err(ContainerError::EngineNotFound(_))));
    }
}
