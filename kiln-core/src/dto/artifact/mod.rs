//! Artifact store DTOs

use serde::{Deserialize, Serialize};

/// Response of the artifact store to an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReceipt {
    /// Generation the store assigned to this upload
    pub generation: u64,
    /// Download location of the stored file
    pub location: String,
}
