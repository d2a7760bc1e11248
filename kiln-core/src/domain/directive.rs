//! Packaging directive
//!
//! Declarative description of what the packaging tool bundles: the target
//! script, single-file mode, the output name, and the hooks the packager's
//! static import scan cannot discover on its own.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::dependency::DependencySet;
use crate::error::PackagingError;

/// Platform the executable is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    #[default]
    Linux,
    Windows,
    Macos,
}

impl TargetPlatform {
    /// Native executable extension, including the dot
    pub fn executable_extension(&self) -> &'static str {
        match self {
            TargetPlatform::Windows => ".exe",
            TargetPlatform::Linux | TargetPlatform::Macos => "",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Some(TargetPlatform::Linux),
            "windows" => Some(TargetPlatform::Windows),
            "macos" | "darwin" => Some(TargetPlatform::Macos),
            _ => None,
        }
    }
}

/// A capability some dependency declares but the directive does not request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityGap {
    HiddenImport { package: String, module: String },
    CollectAll { package: String },
}

impl std::fmt::Display for CapabilityGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityGap::HiddenImport { package, module } => {
                write!(f, "hidden import '{}' (required by {})", module, package)
            }
            CapabilityGap::CollectAll { package } => {
                write!(f, "collect-all for '{}'", package)
            }
        }
    }
}

/// How declared-capability gaps are treated at packaging time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityCheck {
    /// Any gap fails the packaging stage before the packager runs
    #[default]
    Strict,
    /// Gaps are logged and packaging proceeds
    Permissive,
}

/// What to bundle and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingDirective {
    /// Entry point, relative to the repository root
    pub script: PathBuf,

    /// Produce a single self-extracting executable
    pub onefile: bool,

    /// Executable name, without platform extension
    pub output_name: String,

    #[serde(default)]
    pub hidden_imports: Vec<String>,

    /// Packages whose data files are collected wholesale
    #[serde(default)]
    pub collect_all: Vec<String>,
}

impl Default for PackagingDirective {
    fn default() -> Self {
        Self {
            script: PathBuf::from("simple_survey_processor.py"),
            onefile: true,
            output_name: "Survey_Processor".to_string(),
            hidden_imports: vec![
                "pyreadstat._readstat_parser".to_string(),
                "pyreadstat._readstat_writer".to_string(),
            ],
            collect_all: vec!["pyreadstat".to_string()],
        }
    }
}

impl PackagingDirective {
    /// File name of the produced executable on `platform`
    pub fn output_file_name(&self, platform: TargetPlatform) -> String {
        format!("{}{}", self.output_name, platform.executable_extension())
    }

    /// Path of the produced executable, relative to the repository root
    pub fn output_path(&self, platform: TargetPlatform) -> PathBuf {
        PathBuf::from("dist").join(self.output_file_name(platform))
    }

    /// Arguments passed to the packaging tool, script last
    pub fn packager_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.onefile {
            args.push("--onefile".to_string());
        }

        args.push("--name".to_string());
        args.push(self.output_name.clone());

        for module in &self.hidden_imports {
            args.push("--hidden-import".to_string());
            args.push(module.clone());
        }

        for package in &self.collect_all {
            args.push("--collect-all".to_string());
            args.push(package.clone());
        }

        args.push(self.script.to_string_lossy().to_string());
        args
    }

    /// Capabilities declared by `dependencies` that this directive omits
    pub fn capability_gaps(&self, dependencies: &DependencySet) -> Vec<CapabilityGap> {
        let mut gaps = Vec::new();

        for dependency in dependencies.dynamic() {
            for module in &dependency.hidden_imports {
                if !self.hidden_imports.iter().any(|m| m == module) {
                    gaps.push(CapabilityGap::HiddenImport {
                        package: dependency.name.clone(),
                        module: module.clone(),
                    });
                }
            }

            if dependency.collect_all && !self.collect_all.iter().any(|p| p == &dependency.name) {
                gaps.push(CapabilityGap::CollectAll {
                    package: dependency.name.clone(),
                });
            }
        }

        gaps
    }

    /// Fails with the first missing capability
    pub fn check_capabilities(&self, dependencies: &DependencySet) -> Result<(), PackagingError> {
        match self.capability_gaps(dependencies).into_iter().next() {
            None => Ok(()),
            Some(CapabilityGap::HiddenImport { package, module }) => {
                Err(PackagingError::MissingHiddenImport { package, module })
            }
            Some(CapabilityGap::CollectAll { package }) => {
                Err(PackagingError::MissingCollectAll { package })
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.output_name.trim().is_empty() {
            return Err("output name cannot be empty".to_string());
        }
        if self.output_name.contains(['/', '\\']) {
            return Err("output name cannot contain path separators".to_string());
        }
        if self.script.as_os_str().is_empty() {
            return Err("target script cannot be empty".to_string());
        }
        if self.script.is_absolute() {
            return Err("target script must be relative to the repository root".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_args() {
        let directive = PackagingDirective::default();
        assert_eq!(
            directive.packager_args(),
            vec![
                "--onefile",
                "--name",
                "Survey_Processor",
                "--hidden-import",
                "pyreadstat._readstat_parser",
                "--hidden-import",
                "pyreadstat._readstat_writer",
                "--collect-all",
                "pyreadstat",
                "simple_survey_processor.py",
            ]
        );
    }

    #[test]
    fn test_output_path_per_platform() {
        let directive = PackagingDirective::default();
        assert_eq!(
            directive.output_path(TargetPlatform::Windows),
            PathBuf::from("dist/Survey_Processor.exe")
        );
        assert_eq!(
            directive.output_path(TargetPlatform::Linux),
            PathBuf::from("dist/Survey_Processor")
        );
    }

    #[test]
    fn test_default_directive_covers_default_dependencies() {
        let directive = PackagingDirective::default();
        let deps = DependencySet::default();
        assert!(directive.capability_gaps(&deps).is_empty());
        assert!(directive.check_capabilities(&deps).is_ok());
    }

    #[test]
    fn test_missing_hidden_imports_detected() {
        let directive = PackagingDirective {
            hidden_imports: vec![],
            ..PackagingDirective::default()
        };
        let deps = DependencySet::default();

        let gaps = directive.capability_gaps(&deps);
        assert_eq!(gaps.len(), 2);

        match directive.check_capabilities(&deps) {
            Err(PackagingError::MissingHiddenImport { package, module }) => {
                assert_eq!(package, "pyreadstat");
                assert_eq!(module, "pyreadstat._readstat_parser");
            }
            other => panic!("expected missing hidden import, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_collect_all_detected() {
        let directive = PackagingDirective {
            collect_all: vec![],
            ..PackagingDirective::default()
        };

        let result = directive.check_capabilities(&DependencySet::default());
        assert!(matches!(
            result,
            Err(PackagingError::MissingCollectAll { ref package }) if package == "pyreadstat"
        ));
    }

    #[test]
    fn test_validate() {
        assert!(PackagingDirective::default().validate().is_ok());

        let mut directive = PackagingDirective::default();
        directive.output_name = "dist/app".to_string();
        assert!(directive.validate().is_err());

        let mut directive = PackagingDirective::default();
        directive.script = PathBuf::from("/abs/script.py");
        assert!(directive.validate().is_err());
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!(TargetPlatform::parse("Windows"), Some(TargetPlatform::Windows));
        assert_eq!(TargetPlatform::parse("darwin"), Some(TargetPlatform::Macos));
        assert_eq!(TargetPlatform::parse("plan9"), None);
    }
}
