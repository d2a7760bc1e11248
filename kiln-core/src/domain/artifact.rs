//! Artifact domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Binary produced by the packaging stage
///
/// Created once per run and handed unchanged to publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifact {
    /// Fixed logical artifact name
    pub name: String,

    /// Absolute path of the produced binary on the runner host
    pub path: PathBuf,

    pub size_bytes: u64,

    pub built_at: DateTime<Utc>,
}

impl BuildArtifact {
    /// File name of the binary
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Record of a published artifact generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedArtifact {
    pub name: String,

    /// Run the artifact belongs to
    pub run_id: Uuid,

    /// Monotonic generation under `name`; generations never merge
    pub generation: u64,

    /// Where the artifact can be retrieved from (path or URL)
    pub location: String,

    pub file_name: String,

    pub size_bytes: u64,

    pub published_at: DateTime<Utc>,
}
