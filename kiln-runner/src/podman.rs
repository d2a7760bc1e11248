//! Podman container management
//!
//! Handles the build container lifecycle for one run:
//! - Checking podman availability
//! - Starting the run container with the checkout mounted at /workspace
//! - Executing commands in it
//! - Removing it when the run ends (also on drop)

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::process::{CommandOutput, CommandRunner, CommandSpec};

/// Mount point of the checkout inside the container
pub const CONTAINER_WORKDIR: &str = "/workspace";

/// Container manager for a run
///
/// Owns at most one container, named after the run, so concurrent runs never
/// share an environment.
pub struct ContainerManager {
    run_id: Uuid,

    /// Host directory mounted at [`CONTAINER_WORKDIR`]
    mount: PathBuf,

    podman: String,

    runner: Arc<dyn CommandRunner>,

    /// Name of the running container, None before start and after cleanup
    container: Mutex<Option<String>>,
}

impl ContainerManager {
    /// Creates a new container manager
    ///
    /// # Arguments
    /// * `run_id` - The run ID
    /// * `mount` - Host directory to mount as the container working directory
    /// * `podman` - Podman executable
    /// * `runner` - Host command runner
    pub fn new(
        run_id: Uuid,
        mount: PathBuf,
        podman: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            run_id,
            mount,
            podman: podman.into(),
            runner,
            container: Mutex::new(None),
        }
    }

    pub fn container_name(&self) -> String {
        format!("kiln-{}", self.run_id)
    }

    pub fn is_running(&self) -> bool {
        self.container.lock().unwrap().is_some()
    }

    /// Checks that podman is installed and working
    ///
    /// # Returns
    /// The reported podman version
    pub async fn check_available(&self) -> Result<String> {
        let output = self
            .runner
            .run(&CommandSpec::new(&self.podman).arg("--version"))
            .await
            .with_context(|| {
                format!(
                    "Failed to execute '{} --version'. Is podman installed?",
                    self.podman
                )
            })?;

        if !output.success() {
            anyhow::bail!("Podman is not working correctly: {}", output.diagnostic());
        }

        let version = output.stdout.trim().to_string();
        info!("Podman is available: {}", version);
        Ok(version)
    }

    /// Starts the run container from `image`
    ///
    /// The entrypoint is overridden so the container idles until commands
    /// are executed in it. Pulls the image if it is not present locally.
    ///
    /// # Returns
    /// Container name
    pub async fn start(&self, image: &str) -> Result<String> {
        let existing = self.container.lock().unwrap().clone();
        if let Some(name) = existing {
            debug!("Container {} already running", name);
            return Ok(name);
        }

        let container_name = self.container_name();

        tokio::fs::create_dir_all(&self.mount)
            .await
            .context("Failed to create workspace directory")?;

        info!("Creating container {} from image {}", container_name, image);

        let command = CommandSpec::new(&self.podman)
            .arg("run")
            .arg("-d")
            .arg("--name")
            .arg(&container_name)
            .arg("--entrypoint")
            .arg("/bin/sh")
            .arg("-v")
            .arg(format!("{}:{}", self.mount.display(), CONTAINER_WORKDIR))
            .arg("-w")
            .arg(CONTAINER_WORKDIR)
            .arg(image)
            .arg("-c")
            .arg("sleep infinity");

        let output = self
            .runner
            .run(&command)
            .await
            .context("Failed to execute podman run command")?;

        if !output.stderr.trim().is_empty() {
            debug!("podman run stderr: {}", output.stderr.trim());
        }

        if !output.success() {
            let error_msg = format!(
                "Failed to start container from image {}: exit_code={}, {}",
                image,
                output.exit_code,
                output.diagnostic()
            );
            error!("{}", error_msg);
            anyhow::bail!("{}", error_msg);
        }

        info!(
            "Container {} started with ID: {}",
            container_name,
            output.stdout.trim()
        );

        *self.container.lock().unwrap() = Some(container_name.clone());
        Ok(container_name)
    }

    /// Executes a command in the run container
    ///
    /// A command that runs and fails is returned as output with a non-zero
    /// exit code, not as an error.
    pub async fn exec(&self, cmd: &str, args: &[String]) -> Result<CommandOutput> {
        let container_name = self
            .container
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No running container for run {}", self.run_id))?;

        debug!("Executing in container {}: {} {:?}", container_name, cmd, args);

        let command = CommandSpec::new(&self.podman)
            .arg("exec")
            .arg("-w")
            .arg(CONTAINER_WORKDIR)
            .arg(&container_name)
            .arg(cmd)
            .args(args.iter().cloned());

        let output = self
            .runner
            .run(&command)
            .await
            .context("Failed to execute podman exec command")?;

        if !output.success() {
            debug!(
                "Command failed in container {}: cmd={} exit_code={} stderr='{}'",
                container_name,
                cmd,
                output.exit_code,
                output.stderr.trim()
            );
        }

        Ok(output)
    }

    /// Stops and removes the run container
    ///
    /// Safe to call more than once.
    pub async fn cleanup(&self) -> Result<()> {
        let Some(container_name) = self.container.lock().unwrap().take() else {
            return Ok(());
        };

        debug!("Removing container {}", container_name);

        let output = self
            .runner
            .run(&CommandSpec::new(&self.podman).args(["rm", "-f", container_name.as_str()]))
            .await
            .with_context(|| format!("Failed to remove container {}", container_name))?;

        if !output.success() {
            anyhow::bail!(
                "Failed to remove container {}: {}",
                container_name,
                output.diagnostic()
            );
        }

        info!("Cleanup complete for run {}", self.run_id);
        Ok(())
    }
}

impl Drop for ContainerManager {
    fn drop(&mut self) {
        let Ok(mut container) = self.container.lock() else {
            return;
        };
        let Some(container_name) = container.take() else {
            return;
        };

        warn!("Container {} was not torn down, removing it", container_name);

        match std::process::Command::new(&self.podman)
            .args(["rm", "-f", container_name.as_str()])
            .output()
        {
            Ok(output) if output.status.success() => {
                debug!("Container {} removed", container_name);
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("Failed to remove container {}: {}", container_name, stderr.trim());
            }
            Err(e) => {
                warn!("Failed to remove container {}: {}", container_name, e);
            }
        }
    }
}
