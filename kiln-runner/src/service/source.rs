//! Source acquisition service
//!
//! Materializes the repository snapshot for a run into the run's checkout
//! directory:
//! - push with a commit: shallow fetch of that commit, detached checkout
//! - push without a commit or manual dispatch: shallow clone of the branch head
//!
//! A single attempt is made; any git failure fails the stage.

use async_trait::async_trait;
use kiln_core::PipelineError;
use kiln_core::domain::config::BuildConfig;
use kiln_core::domain::trigger::{RunTrigger, normalize_branch};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::context::RunContext;
use crate::process::{CommandRunner, CommandSpec};

/// Checked-out source tree of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    /// Resolved commit id
    pub commit: String,
    /// Repository root on the host
    pub path: PathBuf,
}

/// Service trait for fetching the source snapshot
#[async_trait]
pub trait SourceService: Send + Sync {
    /// Fetches the repository at the triggering revision into
    /// `ctx.source_dir()`
    ///
    /// The snapshot is only returned when the packaging entry point exists
    /// at the repository root.
    async fn fetch(
        &self,
        ctx: &RunContext,
        trigger: &RunTrigger,
        config: &BuildConfig,
    ) -> Result<SourceSnapshot, PipelineError>;
}

/// Git implementation of SourceService
pub struct GitSourceService {
    git: String,
    runner: Arc<dyn CommandRunner>,
}

impl GitSourceService {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            git: "git".to_string(),
            runner,
        }
    }

    pub fn with_git(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }

    /// Runs one git command, mapping any failure to a fetch error
    async fn run_git(
        &self,
        ctx: &RunContext,
        command: CommandSpec,
    ) -> Result<String, PipelineError> {
        ctx.log_debug(command.display());

        let output = self
            .runner
            .run(&command)
            .await
            .map_err(|e| PipelineError::source_fetch(format!("{:#}", e)))?;

        if !output.success() {
            return Err(PipelineError::source_fetch(format!(
                "'{}' exited with {}: {}",
                command.display(),
                output.exit_code,
                output.diagnostic()
            )));
        }

        Ok(output.stdout)
    }

    fn git_in(&self, dir: &Path) -> CommandSpec {
        CommandSpec::new(&self.git).arg("-C").arg(dir.to_string_lossy())
    }
}

/// Remote URLs are used as-is; local repositories are made absolute so they
/// resolve the same from inside the checkout directory
fn resolve_repository(repository: &str) -> Result<String, PipelineError> {
    if repository.contains("://") || repository.starts_with("git@") {
        return Ok(repository.to_string());
    }

    std::fs::canonicalize(repository)
        .map(|path| path.to_string_lossy().to_string())
        .map_err(|e| {
            PipelineError::source_fetch(format!("repository '{}' not found: {}", repository, e))
        })
}

#[async_trait]
impl SourceService for GitSourceService {
    async fn fetch(
        &self,
        ctx: &RunContext,
        trigger: &RunTrigger,
        config: &BuildConfig,
    ) -> Result<SourceSnapshot, PipelineError> {
        let repository = resolve_repository(&config.source.repository)?;
        let dest = ctx.source_dir();

        match trigger {
            RunTrigger::Push {
                commit: Some(commit),
                ..
            } => {
                ctx.log_info(format!("Fetching commit {} from {}", commit, repository));

                let init = CommandSpec::new(&self.git)
                    .args(["init", "-q"])
                    .arg(dest.to_string_lossy());
                self.run_git(ctx, init).await?;

                let remote = self
                    .git_in(&dest)
                    .args(["remote", "add", "origin", repository.as_str()]);
                self.run_git(ctx, remote).await?;

                let fetch = self
                    .git_in(&dest)
                    .args(["fetch", "--depth", "1", "origin", commit.as_str()]);
                self.run_git(ctx, fetch).await?;

                let checkout = self
                    .git_in(&dest)
                    .args(["checkout", "-q", "--detach", "FETCH_HEAD"]);
                self.run_git(ctx, checkout).await?;
            }
            RunTrigger::Push { branch, commit: None } => {
                let branch = normalize_branch(branch);
                ctx.log_info(format!("Cloning {} at {}", repository, branch));
                self.run_git(ctx, clone_command(&self.git, &repository, branch, &dest)).await?;
            }
            RunTrigger::ManualDispatch => {
                let branch = config.trigger.primary_branch.as_str();
                ctx.log_info(format!("Cloning {} at {}", repository, branch));
                self.run_git(ctx, clone_command(&self.git, &repository, branch, &dest)).await?;
            }
        }

        let commit = self
            .run_git(ctx, self.git_in(&dest).args(["rev-parse", "HEAD"]))
            .await?
            .trim()
            .to_string();

        let script = &config.directive.script;
        if !dest.join(script).is_file() {
            return Err(PipelineError::source_fetch(format!(
                "entry point '{}' not found at the repository root",
                script.display()
            )));
        }

        info!("Source snapshot at {} ready in {}", commit, dest.display());

        Ok(SourceSnapshot { commit, path: dest })
    }
}

fn clone_command(git: &str, repository: &str, branch: &str, dest: &Path) -> CommandSpec {
    CommandSpec::new(git)
        .args(["clone", "-q", "--depth", "1", "--branch", branch, repository])
        .arg(dest.to_string_lossy())
}
