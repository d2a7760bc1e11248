//! Artifact publication
//!
//! Publishes the packaged binary unchanged under the fixed artifact name.
//! Every publication creates a new generation; generations are never merged
//! or overwritten.
//!
//! Directory store layout:
//!
//! ```text
//! <root>/<artifact name>/<generation>/<file>
//! <root>/<artifact name>/<generation>.json
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use kiln_client::ArtifactStoreClient;
use kiln_core::PipelineError;
use kiln_core::domain::artifact::{BuildArtifact, PublishedArtifact};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Service trait for publishing a built artifact
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Human readable store description for logs
    fn describe(&self) -> String;

    /// Publishes `artifact` as an artifact of run `run_id`
    ///
    /// A single attempt is made.
    async fn publish(
        &self,
        run_id: Uuid,
        artifact: &BuildArtifact,
    ) -> Result<PublishedArtifact, PipelineError>;
}

/// Local directory artifact store
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    root: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists the published generations of `name`, oldest first
    pub fn list_generations(&self, name: &str) -> Result<Vec<PublishedArtifact>> {
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut generations = Vec::new();
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to read artifact directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let record: PublishedArtifact = serde_json::from_str(&content)
                .with_context(|| format!("Invalid generation record {}", path.display()))?;
            generations.push(record);
        }

        generations.sort_by_key(|g| g.generation);
        Ok(generations)
    }

    /// Highest generation number present under `dir`
    async fn latest_generation(dir: &Path) -> std::io::Result<u64> {
        let mut latest = 0;
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(generation) = entry
                .file_name()
                .to_str()
                .and_then(|n| n.parse::<u64>().ok())
            {
                latest = latest.max(generation);
            }
        }
        Ok(latest)
    }

    /// Claims the next free generation directory
    ///
    /// `create_dir` fails when the directory exists, so two concurrent
    /// publishers never claim the same generation.
    async fn allocate_generation(dir: &Path) -> std::io::Result<(u64, PathBuf)> {
        let mut generation = Self::latest_generation(dir).await? + 1;
        loop {
            let candidate = dir.join(generation.to_string());
            match tokio::fs::create_dir(&candidate).await {
                Ok(()) => return Ok((generation, candidate)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!("Generation {} already taken", generation);
                    generation += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn store(
        &self,
        run_id: Uuid,
        artifact: &BuildArtifact,
    ) -> std::io::Result<PublishedArtifact> {
        let dir = self.root.join(&artifact.name);
        tokio::fs::create_dir_all(&dir).await?;

        let (generation, generation_dir) = Self::allocate_generation(&dir).await?;
        let target = generation_dir.join(artifact.file_name());

        let result = Self::fill_generation(&dir, generation, run_id, artifact, &target).await;
        if result.is_err() {
            Self::release_generation(&dir, generation, &generation_dir).await;
        }
        result
    }

    /// Copies the binary into a claimed generation and writes its record
    async fn fill_generation(
        dir: &Path,
        generation: u64,
        run_id: Uuid,
        artifact: &BuildArtifact,
        target: &Path,
    ) -> std::io::Result<PublishedArtifact> {
        let size_bytes = tokio::fs::copy(&artifact.path, target).await?;

        let published = PublishedArtifact {
            name: artifact.name.clone(),
            run_id,
            generation,
            location: target.display().to_string(),
            file_name: artifact.file_name(),
            size_bytes,
            published_at: Utc::now(),
        };

        let record = serde_json::to_vec_pretty(&published).map_err(std::io::Error::other)?;
        tokio::fs::write(Self::record_path(dir, generation), record).await?;

        Ok(published)
    }

    /// Removes an incomplete generation so no partial publication stays behind
    async fn release_generation(dir: &Path, generation: u64, generation_dir: &Path) {
        if let Err(e) = tokio::fs::remove_dir_all(generation_dir).await {
            warn!(
                "Failed to remove incomplete generation {}: {}",
                generation_dir.display(),
                e
            );
        }

        let record = Self::record_path(dir, generation);
        if tokio::fs::metadata(&record).await.is_ok_and(|m| m.is_file()) {
            if let Err(e) = tokio::fs::remove_file(&record).await {
                warn!("Failed to remove record {}: {}", record.display(), e);
            }
        }
    }

    fn record_path(dir: &Path, generation: u64) -> PathBuf {
        dir.join(format!("{}.json", generation))
    }
}

#[async_trait]
impl ArtifactPublisher for DirectoryPublisher {
    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }

    async fn publish(
        &self,
        run_id: Uuid,
        artifact: &BuildArtifact,
    ) -> Result<PublishedArtifact, PipelineError> {
        let published = self.store(run_id, artifact).await.map_err(|e| {
            PipelineError::publication(format!(
                "cannot store {} in {}: {}",
                artifact.path.display(),
                self.root.display(),
                e
            ))
        })?;

        info!(
            "Published {} generation {} to {}",
            published.name, published.generation, published.location
        );
        Ok(published)
    }
}

/// Remote HTTP artifact store
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: ArtifactStoreClient,
}

impl HttpPublisher {
    pub fn new(client: ArtifactStoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactPublisher for HttpPublisher {
    fn describe(&self) -> String {
        format!("store {}", self.client.base_url())
    }

    async fn publish(
        &self,
        run_id: Uuid,
        artifact: &BuildArtifact,
    ) -> Result<PublishedArtifact, PipelineError> {
        let published = self
            .client
            .upload_artifact(run_id, &artifact.name, &artifact.path)
            .await
            .map_err(|e| {
                let reason = if e.is_server_error() {
                    "store unavailable"
                } else if e.is_client_error() {
                    "upload rejected by store"
                } else {
                    "upload failed"
                };
                PipelineError::publication(format!("{}: {}", reason, e))
            })?;

        info!(
            "Published {} generation {} to {}",
            published.name, published.generation, published.location
        );
        Ok(published)
    }
}
