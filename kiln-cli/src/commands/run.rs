//! Run command handler
//!
//! Executes one pipeline run on this machine and prints its outcome. Ctrl-C
//! requests an abort, which takes effect before the next stage starts.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use kiln_core::domain::log::LogLevel;
use kiln_core::domain::run::RunOutcome;
use kiln_core::dto::run::RunReport;
use kiln_runner::{AbortHandle, ArtifactStoreConfig, PipelineExecutor, RunnerConfig};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::commands::TriggerArgs;
use crate::config::Config;

/// Arguments of `kiln run`
#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub trigger: TriggerArgs,

    /// Commit the push points at (default: branch head)
    #[arg(long, conflicts_with = "manual")]
    pub commit: Option<String>,

    /// Parent directory of run workspaces
    #[arg(long, env = "KILN_WORKSPACE_BASE")]
    pub workspace_base: Option<PathBuf>,

    /// Podman executable
    #[arg(long, env = "KILN_PODMAN", default_value = "podman")]
    pub podman: String,

    /// Artifact store: a directory, or an http(s):// store URL
    #[arg(long, env = "KILN_STORE", default_value = "artifacts")]
    pub store: String,

    /// Keep the run workspace after the run
    #[arg(long)]
    pub keep_workspace: bool,

    /// Write the run report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    fn runner_config(&self) -> RunnerConfig {
        let defaults = RunnerConfig::default();
        RunnerConfig::new(
            self.workspace_base
                .clone()
                .unwrap_or(defaults.workspace_base),
            ArtifactStoreConfig::parse(&self.store),
        )
        .with_podman(&self.podman)
        .with_keep_workspace(self.keep_workspace)
    }
}

/// Handle `kiln run`
pub async fn handle_run_command(args: RunArgs, config: &Config) -> Result<i32> {
    let build = config.load_build_config()?;

    let runner = args.runner_config();
    runner.validate().context("Invalid runner configuration")?;

    let report_path = args.report.clone();
    let trigger = args.trigger.into_trigger(args.commit);

    let abort = AbortHandle::new();
    let on_signal = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Abort requested, stopping before the next stage");
            on_signal.abort();
        }
    });

    let executor = PipelineExecutor::standard(build, runner);
    let report = executor.execute(trigger, abort).await?;

    print_report(&report);

    if let Some(path) = report_path {
        write_report(&report, &path)?;
        println!("  Report: {}", path.display().to_string().dimmed());
    }

    Ok(report.outcome.exit_code())
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write run report to {}", path.display()))
}

fn print_report(report: &RunReport) {
    match &report.outcome {
        RunOutcome::NotScheduled => {
            println!(
                "{}",
                format!(
                    "Trigger {} does not start '{}', nothing to do.",
                    report.trigger.label(),
                    report.pipeline
                )
                .yellow()
            );
            return;
        }
        RunOutcome::Published { artifact } => {
            println!("{}", "✓ Run published".green().bold());
            println!("  Artifact:   {}", artifact.name.bold());
            println!("  Generation: {}", artifact.generation.to_string().cyan());
            println!("  Location:   {}", artifact.location);
            println!("  Size:       {} bytes", artifact.size_bytes);
        }
        RunOutcome::Unpublished { artifact, error } => {
            println!("{}", "! Built but not published".yellow().bold());
            println!("  Binary: {}", artifact.path.display().to_string().cyan());
            println!("  Error:  {}", error.red());
        }
        RunOutcome::Failed { stage, error } => {
            println!("{}", format!("✗ Run failed in {}", stage).red().bold());
            println!("  Error: {}", error.red());
        }
    }

    if let Some(run_id) = report.run_id {
        println!("  Run:    {}", run_id.to_string().dimmed());
    }
    if let Some(commit) = &report.commit {
        println!("  Commit: {}", commit.dimmed());
    }

    let problems: Vec<_> = report
        .logs
        .iter()
        .filter(|entry| matches!(entry.level, LogLevel::Warning | LogLevel::Error))
        .collect();
    if !problems.is_empty() {
        println!();
        for entry in problems {
            let level = match entry.level {
                LogLevel::Error => "error".red(),
                _ => "warning".yellow(),
            };
            println!("  {} {}", level, entry.message);
        }
    }
}
