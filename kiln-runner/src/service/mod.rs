//! Service layer
//!
//! One service per pipeline stage. Each stage reports failures as the
//! matching [`PipelineError`](kiln_core::PipelineError) variant so the
//! executor can map them to the failed stage without inspecting messages.
//!
//! All services are trait-based so the executor can be driven by fakes.

mod dependencies;
mod environment;
mod packaging;
mod publication;
mod source;

// Re-export traits
pub use dependencies::DependencyService;
pub use environment::{BuildEnvironment, EnvironmentService};
pub use packaging::PackagingService;
pub use publication::ArtifactPublisher;
pub use source::{SourceService, SourceSnapshot};

// Re-export implementations
pub use dependencies::PipDependencyService;
pub use environment::PodmanEnvironmentService;
pub use packaging::{PyInstallerPackagingService, check_directive};
pub use publication::{DirectoryPublisher, HttpPublisher};
pub use source::GitSourceService;
