//! Environment provisioning service
//!
//! Starts the build container for a run from the configured runtime image
//! and verifies the interpreter it reports before any dependency is
//! installed. Knows nothing about the application being built.

use anyhow::Result;
use async_trait::async_trait;
use kiln_core::PipelineError;
use kiln_core::domain::config::EnvironmentSpec;
use std::sync::Arc;
use tracing::warn;

use crate::context::RunContext;
use crate::podman::ContainerManager;
use crate::process::{CommandOutput, CommandRunner};

/// A provisioned environment commands can be executed in
#[async_trait]
pub trait BuildEnvironment: Send + Sync {
    /// Human readable description for logs
    fn description(&self) -> String;

    /// Executes `program` with `args` in the checkout directory
    async fn exec(&self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Releases the environment; safe to call more than once
    async fn teardown(&self) -> Result<()>;
}

#[async_trait]
impl BuildEnvironment for ContainerManager {
    fn description(&self) -> String {
        format!("container {}", self.container_name())
    }

    async fn exec(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        ContainerManager::exec(self, program, args).await
    }

    async fn teardown(&self) -> Result<()> {
        self.cleanup().await
    }
}

/// Service trait for provisioning the build environment
#[async_trait]
pub trait EnvironmentService: Send + Sync {
    /// Provisions an environment with the runtime described by `spec`
    ///
    /// On error nothing is left running.
    async fn provision(
        &self,
        ctx: &RunContext,
        spec: &EnvironmentSpec,
    ) -> Result<Arc<dyn BuildEnvironment>, PipelineError>;
}

/// Podman implementation of EnvironmentService
pub struct PodmanEnvironmentService {
    podman: String,
    runner: Arc<dyn CommandRunner>,
}

impl PodmanEnvironmentService {
    pub fn new(podman: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            podman: podman.into(),
            runner,
        }
    }

    /// Checks the interpreter version inside a started container
    async fn verify_runtime(
        &self,
        ctx: &RunContext,
        manager: &ContainerManager,
        spec: &EnvironmentSpec,
    ) -> Result<(), PipelineError> {
        let output = manager
            .exec(&spec.interpreter, &["--version".to_string()])
            .await
            .map_err(|e| PipelineError::environment(format!("{:#}", e)))?;

        if !output.success() {
            return Err(PipelineError::environment(format!(
                "'{} --version' exited with {}: {}",
                spec.interpreter,
                output.exit_code,
                output.diagnostic()
            )));
        }

        // Older interpreters report their version on stderr
        let reported = if output.stdout.trim().is_empty() {
            output.stderr.trim()
        } else {
            output.stdout.trim()
        };

        if !spec.version_matches(reported) {
            return Err(PipelineError::environment(format!(
                "runtime version mismatch: wanted {}, image reports '{}'",
                spec.runtime_version, reported
            )));
        }

        ctx.log_info(format!("Runtime verified: {}", reported));
        Ok(())
    }
}

#[async_trait]
impl EnvironmentService for PodmanEnvironmentService {
    async fn provision(
        &self,
        ctx: &RunContext,
        spec: &EnvironmentSpec,
    ) -> Result<Arc<dyn BuildEnvironment>, PipelineError> {
        let manager = ContainerManager::new(
            ctx.run_id(),
            ctx.source_dir(),
            &self.podman,
            self.runner.clone(),
        );

        let version = manager
            .check_available()
            .await
            .map_err(|e| PipelineError::environment(format!("{:#}", e)))?;
        ctx.log_debug(version);

        let image = spec.image();
        ctx.log_info(format!("Starting build container from {}", image));

        manager
            .start(&image)
            .await
            .map_err(|e| PipelineError::environment(format!("{:#}", e)))?;

        if let Err(e) = self.verify_runtime(ctx, &manager, spec).await {
            if let Err(cleanup) = manager.cleanup().await {
                warn!("Failed to remove container after provisioning error: {:#}", cleanup);
            }
            return Err(e);
        }

        Ok(Arc::new(manager))
    }
}
