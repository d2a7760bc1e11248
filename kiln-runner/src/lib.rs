//! Kiln Runner
//!
//! Executes build runs: one isolated workspace and one build container per
//! run, four strictly sequential stages, fail-fast.
//!
//! Architecture:
//! - Configuration: where workspaces live, which podman binary, which store
//! - Process: host command execution behind a trait
//! - Podman: lifecycle of the per-run build container
//! - Services: one trait per stage with the standard implementations
//! - Pipeline: the executor driving a run through its state machine

pub mod config;
pub mod context;
pub mod pipeline;
pub mod podman;
pub mod process;
pub mod service;

pub use config::{ArtifactStoreConfig, RunnerConfig};
pub use context::{AbortHandle, RunContext};
pub use pipeline::{PipelineExecutor, PipelineServices};
