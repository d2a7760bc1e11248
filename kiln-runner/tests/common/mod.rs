//! In-process stand-ins for git, podman and the artifact store
//!
//! The fake environment behaves like a container with pip and PyInstaller:
//! installs succeed unless a package is marked as failing, and a PyInstaller
//! invocation writes `dist/<name>` into the checkout.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use kiln_core::PipelineError;
use kiln_core::domain::artifact::{BuildArtifact, PublishedArtifact};
use kiln_core::domain::config::{BuildConfig, EnvironmentSpec};
use kiln_core::domain::trigger::RunTrigger;
use kiln_runner::context::{AbortHandle, RunContext};
use kiln_runner::process::CommandOutput;
use kiln_runner::service::{
    ArtifactPublisher, BuildEnvironment, DirectoryPublisher, EnvironmentService,
    PipDependencyService, PyInstallerPackagingService, SourceService, SourceSnapshot,
};
use kiln_runner::{ArtifactStoreConfig, PipelineExecutor, PipelineServices, RunnerConfig};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const COMMIT: &str = "9c1e5a7d3b2f4e6a8c0d1b3f5e7a9c2d4b6f8e0a";

/// Shared record of everything the fakes were asked to do
#[derive(Default, Clone)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn any(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.contains(needle))
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Source service that writes the entry point into the checkout
pub struct FakeSource {
    pub journal: Journal,
}

#[async_trait]
impl SourceService for FakeSource {
    async fn fetch(
        &self,
        ctx: &RunContext,
        trigger: &RunTrigger,
        config: &BuildConfig,
    ) -> Result<SourceSnapshot, PipelineError> {
        self.journal.record(format!("fetch {}", trigger.label()));

        let dir = ctx.source_dir();
        std::fs::create_dir_all(&dir).map_err(|e| PipelineError::source_fetch(e.to_string()))?;
        std::fs::write(dir.join(&config.directive.script), "print('survey')\n")
            .map_err(|e| PipelineError::source_fetch(e.to_string()))?;

        Ok(SourceSnapshot {
            commit: COMMIT.to_string(),
            path: dir,
        })
    }
}

/// A running fake container rooted at a run's checkout
pub struct FakeEnvironment {
    journal: Journal,
    checkout: PathBuf,
    failing_package: Option<String>,
}

#[async_trait]
impl BuildEnvironment for FakeEnvironment {
    fn description(&self) -> String {
        "fake container".to_string()
    }

    async fn exec(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let line = format!("{} {}", program, args.join(" "));
        self.journal.record(format!("exec {}", line));

        if args.iter().any(|a| a == "pip") {
            let package = args.last().cloned().unwrap_or_default();
            if self.failing_package.as_deref() == Some(package.as_str()) {
                return Ok(CommandOutput {
                    stdout: String::new(),
                    stderr: format!("ERROR: Failed building wheel for {}", package),
                    exit_code: 1,
                });
            }
        }

        if args.iter().any(|a| a == "PyInstaller") {
            let name = args
                .iter()
                .position(|a| a == "--name")
                .and_then(|i| args.get(i + 1))
                .cloned()
                .unwrap_or_default();
            let dist = self.checkout.join("dist");
            std::fs::create_dir_all(&dist)?;
            std::fs::write(dist.join(name), b"\x7fELF survey processor")?;
        }

        Ok(CommandOutput::default())
    }

    async fn teardown(&self) -> Result<()> {
        self.journal.record("teardown");
        Ok(())
    }
}

/// Environment service handing out [`FakeEnvironment`]s
pub struct FakeEnvironmentService {
    pub journal: Journal,
    pub failing_package: Option<String>,
    /// Set while provisioning, as if an operator aborted mid-stage
    pub abort_during_provision: Option<AbortHandle>,
}

#[async_trait]
impl EnvironmentService for FakeEnvironmentService {
    async fn provision(
        &self,
        ctx: &RunContext,
        spec: &EnvironmentSpec,
    ) -> Result<Arc<dyn BuildEnvironment>, PipelineError> {
        self.journal.record(format!("provision {}", spec.image()));

        if let Some(abort) = &self.abort_during_provision {
            abort.abort();
        }

        Ok(Arc::new(FakeEnvironment {
            journal: self.journal.clone(),
            checkout: ctx.source_dir(),
            failing_package: self.failing_package.clone(),
        }))
    }
}

/// Publisher whose store is unreachable
pub struct UnreachablePublisher;

#[async_trait]
impl ArtifactPublisher for UnreachablePublisher {
    fn describe(&self) -> String {
        "unreachable store".to_string()
    }

    async fn publish(
        &self,
        _run_id: Uuid,
        _artifact: &BuildArtifact,
    ) -> Result<PublishedArtifact, PipelineError> {
        Err(PipelineError::publication("connection refused"))
    }
}

/// Temporary workspace base and artifact store for one test
pub struct Harness {
    pub journal: Journal,
    pub workspaces: tempfile::TempDir,
    pub store: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            journal: Journal::default(),
            workspaces: tempfile::tempdir().unwrap(),
            store: tempfile::tempdir().unwrap(),
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig::new(
            self.workspaces.path().to_path_buf(),
            ArtifactStoreConfig::Directory(self.store.path().to_path_buf()),
        )
    }

    pub fn publisher(&self) -> DirectoryPublisher {
        DirectoryPublisher::new(self.store.path())
    }

    /// Real pip and PyInstaller services on top of the fake environment
    pub fn services(&self, environment: FakeEnvironmentService) -> PipelineServices {
        PipelineServices {
            source: Arc::new(FakeSource {
                journal: self.journal.clone(),
            }),
            environment: Arc::new(environment),
            dependencies: Arc::new(PipDependencyService::new()),
            packaging: Arc::new(PyInstallerPackagingService::new()),
            publisher: Arc::new(self.publisher()),
        }
    }

    pub fn environment(&self) -> FakeEnvironmentService {
        FakeEnvironmentService {
            journal: self.journal.clone(),
            failing_package: None,
            abort_during_provision: None,
        }
    }

    pub fn executor(&self, config: BuildConfig) -> PipelineExecutor {
        PipelineExecutor::new(config, self.runner_config(), self.services(self.environment()))
    }

    pub fn workspace_count(&self) -> usize {
        std::fs::read_dir(self.workspaces.path()).unwrap().count()
    }
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
