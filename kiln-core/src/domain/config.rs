//! Build configuration
//!
//! Everything the pipeline needs to know about *what* to build lives in
//! [`BuildConfig`]. It is passed explicitly into the pipeline entry point and
//! never read from the ambient environment; [`BuildConfig::default`] holds the
//! documented defaults.

use serde::{Deserialize, Serialize};

use crate::domain::dependency::DependencySet;
use crate::domain::directive::{CapabilityCheck, PackagingDirective, TargetPlatform};
use crate::domain::trigger::TriggerPolicy;

/// Where the source snapshot is fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Clone URL or local path of the repository
    pub repository: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repository: ".".to_string(),
        }
    }
}

/// Build environment: OS image plus pinned runtime version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    /// Runtime image repository (e.g. docker.io/library/python)
    pub image_repository: String,

    /// OS variant suffix of the image tag (e.g. bookworm)
    pub os_variant: String,

    /// Exact (3.11.4) or minor (3.11) runtime version
    pub runtime_version: String,

    /// Interpreter invoked inside the environment
    pub interpreter: String,
}

impl Default for EnvironmentSpec {
    fn default() -> Self {
        Self {
            image_repository: "docker.io/library/python".to_string(),
            os_variant: "bookworm".to_string(),
            runtime_version: "3.11".to_string(),
            interpreter: "python".to_string(),
        }
    }
}

impl EnvironmentSpec {
    /// Fully qualified image reference for the build container
    pub fn image(&self) -> String {
        if self.os_variant.is_empty() {
            format!("{}:{}", self.image_repository, self.runtime_version)
        } else {
            format!(
                "{}:{}-{}",
                self.image_repository, self.runtime_version, self.os_variant
            )
        }
    }

    /// Checks an interpreter version report against the specifier
    ///
    /// Accepts reports like `Python 3.11.9` or a bare `3.11.9`. Every
    /// component of the specifier must equal the matching reported component.
    pub fn version_matches(&self, reported: &str) -> bool {
        let Some(version) = extract_version(reported) else {
            return false;
        };

        let wanted: Vec<&str> = self.runtime_version.split('.').collect();
        let actual: Vec<&str> = version.split('.').collect();

        wanted.len() <= actual.len() && wanted.iter().zip(actual.iter()).all(|(w, a)| w == a)
    }
}

/// First whitespace-separated token that looks like a dotted version
fn extract_version(reported: &str) -> Option<&str> {
    reported.split_whitespace().find(|token| {
        token.contains('.')
            && token
                .split('.')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
    })
}

/// Complete pipeline definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Human readable pipeline name
    pub name: String,

    pub trigger: TriggerPolicy,

    pub source: SourceConfig,

    pub environment: EnvironmentSpec,

    pub dependencies: DependencySet,

    pub directive: PackagingDirective,

    pub capability_check: CapabilityCheck,

    pub platform: TargetPlatform,

    /// Fixed logical name the binary is published under
    pub artifact_name: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            name: "survey-processor".to_string(),
            trigger: TriggerPolicy::default(),
            source: SourceConfig::default(),
            environment: EnvironmentSpec::default(),
            dependencies: DependencySet::default(),
            directive: PackagingDirective::default(),
            capability_check: CapabilityCheck::default(),
            platform: TargetPlatform::default(),
            artifact_name: "Survey_Processor".to_string(),
        }
    }
}

impl BuildConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name cannot be empty".to_string());
        }

        if self.trigger.primary_branch.trim().is_empty() {
            return Err("primary branch cannot be empty".to_string());
        }

        if self.source.repository.trim().is_empty() {
            return Err("source repository cannot be empty".to_string());
        }

        if self.environment.runtime_version.trim().is_empty() {
            return Err("runtime version cannot be empty".to_string());
        }

        if extract_version(&self.environment.runtime_version).is_none()
            && !self
                .environment
                .runtime_version
                .chars()
                .all(|c| c.is_ascii_digit())
        {
            return Err(format!(
                "runtime version '{}' is not a dotted version",
                self.environment.runtime_version
            ));
        }

        if self.environment.image_repository.trim().is_empty() {
            return Err("image repository cannot be empty".to_string());
        }

        if self.artifact_name.trim().is_empty() {
            return Err("artifact name cannot be empty".to_string());
        }

        if self.artifact_name.contains(['/', '\\']) || self.artifact_name.starts_with('.') {
            return Err(format!("artifact name '{}' is not a plain name", self.artifact_name));
        }

        self.dependencies.validate()?;
        self.directive.validate()?;

        Ok(())
    }
}
