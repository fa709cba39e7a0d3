use crate::{ProvisionError, Provisioner};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;

const DOCKER: &str = "docker";

static CONTAINERS: AtomicU64 = AtomicU64::new(0);

fn container_name() -> String {
    format!(
        "custom-resource-{}-{}",
        std::process::id(),
        CONTAINERS.fetch_add(1, Ordering::Relaxed)
    )
}

/// Force removes a container whose run was dropped before docker exited.
///
/// Killing the docker client does not stop the container it started, so a
/// timed out run would otherwise leave the container running.
struct ContainerGuard<'a> {
    docker: &'a str,
    name: &'a str,
    armed: bool,
}

impl<'a> ContainerGuard<'a> {
    fn new(docker: &'a str, name: &'a str) -> Self {
        ContainerGuard {
            docker,
            name,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ContainerGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        tracing::warn!(container = self.name, "Provisioning was abandoned, removing container");

        if tokio::runtime::Handle::try_current().is_err() {
            tracing::error!(container = self.name, "No runtime left to remove container");
            return;
        }

        // Not awaited, the runtime reaps the child once it exits
        let removal = Command::new(self.docker)
            .args(["rm", "-f", self.name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        if let Err(err) = removal {
            tracing::error!(container = self.name, "Failed to remove container: {err}");
        }
    }
}

/// Runs provisioning work in a disposable container via the docker CLI.
///
/// Every container gets a unique name so it can be removed if the run is
/// abandoned, e.g. when the provisioning timeout expires.
pub struct DockerProvisioner {
    docker: String,
}

impl Default for DockerProvisioner {
    fn default() -> Self {
        DockerProvisioner::with_binary(DOCKER)
    }
}

impl DockerProvisioner {
    /// Use a different docker compatible binary, e.g. `podman`.
    pub fn with_binary(docker: impl Into<String>) -> Self {
        DockerProvisioner {
            docker: docker.into(),
        }
    }
}

#[async_trait]
impl Provisioner for DockerProvisioner {
    async fn run(&self, image: &str, command: &str) -> Result<String, ProvisionError> {
        let name: String = container_name();
        tracing::debug!(image, command, container = %name, "Starting provisioning container");

        let guard: ContainerGuard = ContainerGuard::new(&self.docker, &name);
        let result: std::io::Result<Output> = Command::new(&self.docker)
            .args(["run", "--rm", "--name", &name, image, "sh", "-c", command])
            .kill_on_drop(true)
            .output()
            .await;
        // docker exited, `--rm` takes care of the container
        guard.disarm();

        let output: Output = result.map_err(ProvisionError::Spawn)?;

        if !output.status.success() {
            return Err(ProvisionError::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
