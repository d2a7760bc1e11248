//! Packaging service
//!
//! Bundles the target script, interpreter and installed dependencies into a
//! single executable with PyInstaller.
//!
//! [`check_directive`] runs before any packager is invoked and compares the
//! directive against the capabilities the dependencies declare.

use async_trait::async_trait;
use chrono::Utc;
use kiln_core::domain::artifact::BuildArtifact;
use kiln_core::domain::config::BuildConfig;
use kiln_core::domain::directive::CapabilityCheck;
use kiln_core::{PackagingError, PipelineError};

use crate::context::RunContext;
use crate::service::environment::BuildEnvironment;

/// Checks the packaging directive against declared dependency capabilities
///
/// In strict mode the first gap is returned as an error; in permissive mode
/// every gap is logged as a warning and the check passes.
pub fn check_directive(ctx: &RunContext, config: &BuildConfig) -> Result<(), PackagingError> {
    let gaps = config.directive.capability_gaps(&config.dependencies);
    if gaps.is_empty() {
        return Ok(());
    }

    match config.capability_check {
        CapabilityCheck::Strict => config.directive.check_capabilities(&config.dependencies),
        CapabilityCheck::Permissive => {
            for gap in &gaps {
                ctx.log_warning(format!(
                    "Packaging directive is missing {}; the binary may fail at runtime",
                    gap
                ));
            }
            Ok(())
        }
    }
}

/// Service trait for producing the executable
#[async_trait]
pub trait PackagingService: Send + Sync {
    /// Runs the packager and returns the single produced binary
    async fn package(
        &self,
        ctx: &RunContext,
        env: &dyn BuildEnvironment,
        config: &BuildConfig,
    ) -> Result<BuildArtifact, PipelineError>;
}

/// PyInstaller implementation of PackagingService
#[derive(Debug, Clone, Default)]
pub struct PyInstallerPackagingService;

impl PyInstallerPackagingService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PackagingService for PyInstallerPackagingService {
    async fn package(
        &self,
        ctx: &RunContext,
        env: &dyn BuildEnvironment,
        config: &BuildConfig,
    ) -> Result<BuildArtifact, PipelineError> {
        let directive = &config.directive;

        if !ctx.source_dir().join(&directive.script).is_file() {
            return Err(PackagingError::ScriptNotFound(directive.script.clone()).into());
        }

        let mut args = vec!["-m".to_string(), "PyInstaller".to_string()];
        args.extend(directive.packager_args());

        ctx.log_info(format!(
            "Packaging: {} {}",
            config.environment.interpreter,
            args.join(" ")
        ));

        let output = env
            .exec(&config.environment.interpreter, &args)
            .await
            .map_err(|e| PackagingError::Io(format!("{:#}", e)))?;

        if !output.success() {
            return Err(PackagingError::ToolFailed {
                exit_code: output.exit_code,
                stderr: output.diagnostic(),
            }
            .into());
        }

        let relative = directive.output_path(config.platform);
        let path = ctx.source_dir().join(&relative);

        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Err(PackagingError::OutputMissing(relative).into()),
        };

        ctx.log_info(format!(
            "Built {} ({} bytes)",
            relative.display(),
            metadata.len()
        ));

        Ok(BuildArtifact {
            name: config.artifact_name.clone(),
            path,
            size_bytes: metadata.len(),
            built_at: Utc::now(),
        })
    }
}
