//! Dependency installation service
//!
//! Installs the dependency set into the build environment one package at a
//! time, in listed order. The first failing package fails the stage.

use async_trait::async_trait;
use kiln_core::PipelineError;
use kiln_core::domain::config::BuildConfig;

use crate::context::RunContext;
use crate::service::environment::BuildEnvironment;

/// Service trait for installing the dependency set
#[async_trait]
pub trait DependencyService: Send + Sync {
    async fn install(
        &self,
        ctx: &RunContext,
        env: &dyn BuildEnvironment,
        config: &BuildConfig,
    ) -> Result<(), PipelineError>;
}

/// pip implementation of DependencyService
#[derive(Debug, Clone, Default)]
pub struct PipDependencyService;

impl PipDependencyService {
    pub fn new() -> Self {
        Self
    }

    fn install_args(package: &str) -> Vec<String> {
        [
            "-m",
            "pip",
            "install",
            "--disable-pip-version-check",
            "--no-cache-dir",
            package,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

#[async_trait]
impl DependencyService for PipDependencyService {
    async fn install(
        &self,
        ctx: &RunContext,
        env: &dyn BuildEnvironment,
        config: &BuildConfig,
    ) -> Result<(), PipelineError> {
        let interpreter = &config.environment.interpreter;

        for dependency in config.dependencies.packages() {
            ctx.log_info(format!(
                "Installing {} ({})",
                dependency.name, dependency.kind
            ));

            let output = env
                .exec(interpreter, &Self::install_args(&dependency.name))
                .await
                .map_err(|e| PipelineError::dependency(&dependency.name, format!("{:#}", e)))?;

            if !output.success() {
                ctx.log_error(format!(
                    "pip exited with {} for {}",
                    output.exit_code, dependency.name
                ));
                return Err(PipelineError::dependency(
                    &dependency.name,
                    output.diagnostic(),
                ));
            }

            ctx.log_debug(format!("{} installed", dependency.name));
        }

        Ok(())
    }
}
