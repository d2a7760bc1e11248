//! Runner configuration
//!
//! Mechanism settings only: where run workspaces are created, which podman
//! binary to drive and where artifacts are published. What gets built is
//! described by `BuildConfig` and never by this structure.

use std::path::PathBuf;

/// Where published artifacts go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStoreConfig {
    /// Local directory store, one subdirectory per generation
    Directory(PathBuf),
    /// Remote HTTP artifact store base URL
    Http(String),
}

impl ArtifactStoreConfig {
    /// `http://` and `https://` values select the HTTP store, anything else
    /// is a directory path
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            ArtifactStoreConfig::Http(value.to_string())
        } else {
            ArtifactStoreConfig::Directory(PathBuf::from(value))
        }
    }
}

impl std::fmt::Display for ArtifactStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactStoreConfig::Directory(path) => write!(f, "{}", path.display()),
            ArtifactStoreConfig::Http(url) => write!(f, "{}", url),
        }
    }
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Parent directory of per-run workspaces
    pub workspace_base: PathBuf,

    /// Podman executable
    pub podman: String,

    /// Keep the run workspace after the run ends
    pub keep_workspace: bool,

    pub store: ArtifactStoreConfig,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new(workspace_base: PathBuf, store: ArtifactStoreConfig) -> Self {
        Self {
            workspace_base,
            podman: "podman".to_string(),
            keep_workspace: false,
            store,
        }
    }

    pub fn with_podman(mut self, podman: impl Into<String>) -> Self {
        self.podman = podman.into();
        self
    }

    pub fn with_keep_workspace(mut self, keep: bool) -> Self {
        self.keep_workspace = keep;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workspace_base.as_os_str().is_empty() {
            anyhow::bail!("workspace_base cannot be empty");
        }

        if self.podman.trim().is_empty() {
            anyhow::bail!("podman executable cannot be empty");
        }

        match &self.store {
            ArtifactStoreConfig::Directory(path) => {
                if path.as_os_str().is_empty() {
                    anyhow::bail!("artifact store directory cannot be empty");
                }
                if path.starts_with(&self.workspace_base) {
                    anyhow::bail!("artifact store cannot live inside the workspace base");
                }
            }
            ArtifactStoreConfig::Http(url) => {
                let host = url.split("://").nth(1).unwrap_or_default();
                if host.trim_matches('/').is_empty() {
                    anyhow::bail!("artifact store URL '{}' has no host", url);
                }
            }
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new(
            std::env::temp_dir().join("kiln-runs"),
            ArtifactStoreConfig::Directory(PathBuf::from("artifacts")),
        )
    }
}
