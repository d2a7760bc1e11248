//! Pipeline executor
//!
//! Drives one run through its stages:
//!
//! ```text
//! trigger ─▶ source ─▶ environment ─▶ dependencies ─▶ packaging ─▶ publication
//! ```
//!
//! Stages run strictly in order and the first failure ends the run. The
//! build environment is torn down whenever it was provisioned, and the
//! abort flag is only looked at between stages.

use anyhow::{Context, Result};
use kiln_client::ArtifactStoreClient;
use kiln_core::PipelineError;
use kiln_core::domain::artifact::{BuildArtifact, PublishedArtifact};
use kiln_core::domain::config::BuildConfig;
use kiln_core::domain::run::{Run, RunOutcome, Stage};
use kiln_core::domain::trigger::{RunTrigger, evaluate_trigger};
use kiln_core::dto::run::RunReport;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{ArtifactStoreConfig, RunnerConfig};
use crate::context::{AbortHandle, RunContext};
use crate::process::{CommandRunner, HostCommandRunner};
use crate::service::{
    ArtifactPublisher, BuildEnvironment, DependencyService, DirectoryPublisher,
    EnvironmentService, GitSourceService, HttpPublisher, PackagingService, PipDependencyService,
    PodmanEnvironmentService, PyInstallerPackagingService, SourceService, check_directive,
};

/// One service per stage
#[derive(Clone)]
pub struct PipelineServices {
    pub source: Arc<dyn SourceService>,
    pub environment: Arc<dyn EnvironmentService>,
    pub dependencies: Arc<dyn DependencyService>,
    pub packaging: Arc<dyn PackagingService>,
    pub publisher: Arc<dyn ArtifactPublisher>,
}

impl PipelineServices {
    /// git, podman, pip and PyInstaller on the host, publishing to the
    /// configured store
    pub fn standard(runner: &RunnerConfig) -> Self {
        let commands: Arc<dyn CommandRunner> = Arc::new(HostCommandRunner);

        let publisher: Arc<dyn ArtifactPublisher> = match &runner.store {
            ArtifactStoreConfig::Directory(root) => Arc::new(DirectoryPublisher::new(root.clone())),
            ArtifactStoreConfig::Http(url) => {
                Arc::new(HttpPublisher::new(ArtifactStoreClient::new(url.clone())))
            }
        };

        Self {
            source: Arc::new(GitSourceService::new(commands.clone())),
            environment: Arc::new(PodmanEnvironmentService::new(&runner.podman, commands)),
            dependencies: Arc::new(PipDependencyService::new()),
            packaging: Arc::new(PyInstallerPackagingService::new()),
            publisher,
        }
    }
}

/// Executes runs of one build configuration
pub struct PipelineExecutor {
    config: BuildConfig,
    runner: RunnerConfig,
    services: PipelineServices,
}

impl PipelineExecutor {
    pub fn new(config: BuildConfig, runner: RunnerConfig, services: PipelineServices) -> Self {
        Self {
            config,
            runner,
            services,
        }
    }

    /// Executor wired with [`PipelineServices::standard`]
    pub fn standard(config: BuildConfig, runner: RunnerConfig) -> Self {
        let services = PipelineServices::standard(&runner);
        Self::new(config, runner, services)
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Runs the pipeline for `trigger`
    ///
    /// Stage failures are reported in the returned report's outcome. An
    /// `Err` means the run could not be carried out at all (invalid
    /// configuration, broken state machine).
    pub async fn execute(&self, trigger: RunTrigger, abort: AbortHandle) -> Result<RunReport> {
        self.config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid build configuration: {}", e))?;

        if !evaluate_trigger(&trigger, &self.config.trigger).should_start() {
            info!(
                "Trigger {} is not eligible for '{}', run not scheduled",
                trigger.label(),
                self.config.name
            );
            return Ok(RunReport::not_scheduled(&self.config.name, trigger));
        }

        let mut run = Run::new(trigger);
        let ctx = RunContext::new(run.id, &self.runner.workspace_base, abort);

        info!(
            "Starting run {} of '{}' ({})",
            run.id,
            self.config.name,
            run.trigger.label()
        );
        ctx.log_info(format!("Run triggered by {}", run.trigger.label()));

        let result = self.run_stages(&ctx, &mut run).await;
        let outcome = self.conclude(&ctx, &mut run, result).await?;

        match &outcome {
            RunOutcome::Published { .. } => info!("Run {} published", run.id),
            RunOutcome::Unpublished { .. } => warn!("Run {} built but not published", run.id),
            _ => error!("Run {} failed in state {:?}", run.id, run.state),
        }

        Ok(RunReport::from_run(
            &self.config.name,
            &run,
            outcome,
            ctx.drain_logs(),
        ))
    }

    /// Turns the result of the stages into the run outcome
    ///
    /// The workspace is settled before anything is returned, including
    /// errors that are not stage failures.
    async fn conclude(
        &self,
        ctx: &RunContext,
        run: &mut Run,
        result: Result<PublishedArtifact>,
    ) -> Result<RunOutcome> {
        let outcome = match result {
            Ok(published) => {
                ctx.log_info(format!(
                    "Published {} generation {}",
                    published.name, published.generation
                ));
                Ok(RunOutcome::Published {
                    artifact: published,
                })
            }
            Err(err) => Self::failure_outcome(ctx, run, err),
        };

        let keep_artifact = matches!(outcome, Ok(RunOutcome::Unpublished { .. }));
        self.finish_workspace(ctx, keep_artifact).await;
        outcome
    }

    fn failure_outcome(ctx: &RunContext, run: &mut Run, err: anyhow::Error) -> Result<RunOutcome> {
        let err = err.downcast::<PipelineError>()?;
        let stage = err.stage();
        ctx.log_error(format!("Stage '{}' failed: {}", stage, err));
        run.fail_stage(stage)?;

        Ok(match (&err, run.artifact.clone()) {
            (PipelineError::Publication(_), Some(artifact)) => RunOutcome::Unpublished {
                artifact,
                error: err.to_string(),
            },
            _ => RunOutcome::Failed {
                stage,
                error: err.to_string(),
            },
        })
    }

    /// Runs every stage; stage failures are [`PipelineError`]s
    async fn run_stages(&self, ctx: &RunContext, run: &mut Run) -> Result<PublishedArtifact> {
        self.begin(ctx, Stage::SourceAcquisition)?;
        tokio::fs::create_dir_all(ctx.workspace())
            .await
            .map_err(|e| {
                PipelineError::source_fetch(format!(
                    "cannot create workspace {}: {}",
                    ctx.workspace().display(),
                    e
                ))
            })?;
        let snapshot = self
            .services
            .source
            .fetch(ctx, &run.trigger, &self.config)
            .await?;
        ctx.log_info(format!("Checked out {}", snapshot.commit));
        run.commit = Some(snapshot.commit);
        run.complete_stage(Stage::SourceAcquisition)?;

        self.begin(ctx, Stage::EnvironmentProvisioning)?;
        let env = self
            .services
            .environment
            .provision(ctx, &self.config.environment)
            .await?;
        ctx.log_info(format!("Environment ready: {}", env.description()));
        run.complete_stage(Stage::EnvironmentProvisioning)?;

        let built = self.build(ctx, run, env.as_ref()).await;

        if let Err(e) = env.teardown().await {
            ctx.log_warning(format!(
                "Failed to tear down {}: {:#}",
                env.description(),
                e
            ));
        }

        let artifact = built?;

        self.begin(ctx, Stage::ArtifactPublication)?;
        ctx.log_info(format!(
            "Publishing {} to {}",
            artifact.file_name(),
            self.services.publisher.describe()
        ));
        let published = self.services.publisher.publish(run.id, &artifact).await?;
        run.published = Some(published.clone());
        run.complete_stage(Stage::ArtifactPublication)?;

        Ok(published)
    }

    /// Dependency installation and packaging inside `env`
    async fn build(
        &self,
        ctx: &RunContext,
        run: &mut Run,
        env: &dyn BuildEnvironment,
    ) -> Result<BuildArtifact> {
        self.begin(ctx, Stage::DependencyInstallation)?;
        self.services
            .dependencies
            .install(ctx, env, &self.config)
            .await?;
        run.complete_stage(Stage::DependencyInstallation)?;

        self.begin(ctx, Stage::Packaging)?;
        check_directive(ctx, &self.config).map_err(PipelineError::from)?;
        let artifact = self.services.packaging.package(ctx, env, &self.config).await?;
        run.artifact = Some(artifact.clone());
        run.complete_stage(Stage::Packaging)?;

        Ok(artifact)
    }

    /// Checks the abort flag and announces `stage`
    fn begin(&self, ctx: &RunContext, stage: Stage) -> Result<(), PipelineError> {
        if ctx.is_aborted() {
            ctx.log_warning(format!("Abort requested before {}", stage));
            return Err(PipelineError::Aborted(stage));
        }

        info!("Stage {}/{}: {}", stage.position(), Stage::ALL.len(), stage);
        ctx.log_info(format!("Starting stage: {}", stage));
        Ok(())
    }

    /// Removes the run workspace unless it must be kept
    ///
    /// An unpublished binary only exists in the workspace, so it is always
    /// kept in that case.
    async fn finish_workspace(&self, ctx: &RunContext, keep_artifact: bool) {
        let workspace = ctx.workspace();
        if !workspace.exists() {
            return;
        }

        if self.runner.keep_workspace || keep_artifact {
            ctx.log_info(format!("Workspace kept at {}", workspace.display()));
            return;
        }

        if let Err(e) = tokio::fs::remove_dir_all(workspace)
            .await
            .with_context(|| format!("Failed to remove workspace {}", workspace.display()))
        {
            ctx.log_warning(format!("{:#}", e));
        }
    }
}
