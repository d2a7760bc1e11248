//! Pipeline error taxonomy
//!
//! Each variant maps onto exactly one stage; the stage is the primary
//! diagnostic reported for a failed run. An ineligible trigger is not an
//! error and has no variant here.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::run::Stage;

/// Fatal error raised by a pipeline stage
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source acquisition failed: {0}")]
    SourceFetch(String),

    #[error("environment provisioning failed: {0}")]
    EnvironmentProvision(String),

    #[error("installing '{package}' failed: {message}")]
    DependencyInstall { package: String, message: String },

    #[error("packaging failed: {0}")]
    Packaging(#[from] PackagingError),

    #[error("artifact publication failed: {0}")]
    Publication(String),

    /// The run was aborted between stages, before `0` started
    #[error("run aborted before {0}")]
    Aborted(Stage),
}

impl PipelineError {
    /// Stage the error is attributed to
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::SourceFetch(_) => Stage::SourceAcquisition,
            PipelineError::EnvironmentProvision(_) => Stage::EnvironmentProvisioning,
            PipelineError::DependencyInstall { .. } => Stage::DependencyInstallation,
            PipelineError::Packaging(_) => Stage::Packaging,
            PipelineError::Publication(_) => Stage::ArtifactPublication,
            PipelineError::Aborted(stage) => *stage,
        }
    }

    pub fn source_fetch(message: impl Into<String>) -> Self {
        Self::SourceFetch(message.into())
    }

    pub fn environment(message: impl Into<String>) -> Self {
        Self::EnvironmentProvision(message.into())
    }

    pub fn dependency(package: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DependencyInstall {
            package: package.into(),
            message: message.into(),
        }
    }

    pub fn publication(message: impl Into<String>) -> Self {
        Self::Publication(message.into())
    }
}

/// Failure of the packaging sub-step
#[derive(Debug, Error)]
pub enum PackagingError {
    /// A dependency declares a hidden import the directive does not list
    #[error("directive is missing hidden import '{module}' required by '{package}'")]
    MissingHiddenImport { package: String, module: String },

    #[error("directive does not collect resources of '{package}'")]
    MissingCollectAll { package: String },

    #[error("target script '{}' not found", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("packager exited with code {exit_code}: {stderr}")]
    ToolFailed { exit_code: i32, stderr: String },

    #[error("packager did not produce '{}'", .0.display())]
    OutputMissing(PathBuf),

    #[error("failed to run packager: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_map_to_stages() {
        assert_eq!(
            PipelineError::source_fetch("no route").stage(),
            Stage::SourceAcquisition
        );
        assert_eq!(
            PipelineError::environment("no such image").stage(),
            Stage::EnvironmentProvisioning
        );
        assert_eq!(
            PipelineError::dependency("pyreadstat", "exit 1").stage(),
            Stage::DependencyInstallation
        );
        assert_eq!(
            PipelineError::from(PackagingError::OutputMissing(PathBuf::from("dist/x"))).stage(),
            Stage::Packaging
        );
        assert_eq!(
            PipelineError::publication("503").stage(),
            Stage::ArtifactPublication
        );
        assert_eq!(
            PipelineError::Aborted(Stage::Packaging).stage(),
            Stage::Packaging
        );
    }

    #[test]
    fn test_error_messages() {
        let err = PipelineError::dependency("pyreadstat", "exit code 1");
        assert_eq!(err.to_string(), "installing 'pyreadstat' failed: exit code 1");

        let err = PipelineError::from(PackagingError::MissingHiddenImport {
            package: "pyreadstat".to_string(),
            module: "pyreadstat._readstat_parser".to_string(),
        });
        assert!(err.to_string().contains("pyreadstat._readstat_parser"));
    }
}
