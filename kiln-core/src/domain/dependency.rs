//! Dependency set domain types
//!
//! The dependency set is the fixed, ordered list of packages installed into the
//! build environment before packaging. Packages that load native submodules
//! dynamically declare those submodules as capabilities so the packaging
//! directive can be checked against them.

use serde::{Deserialize, Serialize};

/// Role a package plays in the build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    NetworkClient,
    TabularData,
    StatisticalFileFormat,
    NumericArray,
    PackagingTool,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::NetworkClient => "network-client",
            DependencyKind::TabularData => "tabular-data",
            DependencyKind::StatisticalFileFormat => "statistical-file-format",
            DependencyKind::NumericArray => "numeric-array",
            DependencyKind::PackagingTool => "packaging-tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "network-client" => Some(DependencyKind::NetworkClient),
            "tabular-data" => Some(DependencyKind::TabularData),
            "statistical-file-format" => Some(DependencyKind::StatisticalFileFormat),
            "numeric-array" => Some(DependencyKind::NumericArray),
            "packaging-tool" => Some(DependencyKind::PackagingTool),
            _ => None,
        }
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A package to install, unpinned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Package name as understood by the installer
    pub name: String,

    pub kind: DependencyKind,

    /// Submodules loaded dynamically, invisible to the packager's import scan
    #[serde(default)]
    pub hidden_imports: Vec<String>,

    /// Whether the packager must collect every data file of this package
    #[serde(default)]
    pub collect_all: bool,
}

impl Dependency {
    pub fn new(name: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            hidden_imports: Vec::new(),
            collect_all: false,
        }
    }

    pub fn with_hidden_import(mut self, module: impl Into<String>) -> Self {
        self.hidden_imports.push(module.into());
        self
    }

    pub fn with_collect_all(mut self) -> Self {
        self.collect_all = true;
        self
    }

    /// True if the package needs explicit packager hooks
    pub fn uses_dynamic_loading(&self) -> bool {
        !self.hidden_imports.is_empty() || self.collect_all
    }
}

/// Ordered set of packages installed once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySet {
    packages: Vec<Dependency>,
}

impl DependencySet {
    pub fn new(packages: Vec<Dependency>) -> Self {
        Self { packages }
    }

    pub fn packages(&self) -> &[Dependency] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn find_kind(&self, kind: DependencyKind) -> Option<&Dependency> {
        self.packages.iter().find(|p| p.kind == kind)
    }

    /// Packages whose declared capabilities the directive must cover
    pub fn dynamic(&self) -> impl Iterator<Item = &Dependency> {
        self.packages.iter().filter(|p| p.uses_dynamic_loading())
    }

    /// Package names in install order
    pub fn names(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.name.as_str()).collect()
    }

    /// Checks that names are unique and a packaging tool is present
    pub fn validate(&self) -> Result<(), String> {
        if self.packages.is_empty() {
            return Err("dependency set cannot be empty".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for package in &self.packages {
            if package.name.trim().is_empty() {
                return Err("dependency name cannot be empty".to_string());
            }
            if !seen.insert(package.name.as_str()) {
                return Err(format!("dependency '{}' is listed twice", package.name));
            }
        }

        if self.find_kind(DependencyKind::PackagingTool).is_none() {
            return Err("dependency set must include a packaging tool".to_string());
        }

        Ok(())
    }
}

impl Default for DependencySet {
    /// requests, pandas, pyreadstat, numpy, pyinstaller
    fn default() -> Self {
        Self::new(vec![
            Dependency::new("requests", DependencyKind::NetworkClient),
            Dependency::new("pandas", DependencyKind::TabularData),
            Dependency::new("pyreadstat", DependencyKind::StatisticalFileFormat)
                .with_hidden_import("pyreadstat._readstat_parser")
                .with_hidden_import("pyreadstat._readstat_writer")
                .with_collect_all(),
            Dependency::new("numpy", DependencyKind::NumericArray),
            Dependency::new("pyinstaller", DependencyKind::PackagingTool),
        ])
    }
}
