//! Commands module
//!
//! Defines all CLI commands and their handlers. Handlers return the process
//! exit code.

mod artifacts;
mod evaluate;
mod init;
mod plan;
mod run;

pub use artifacts::ArtifactCommands;
pub use run::RunArgs;

use anyhow::Result;
use clap::{Args, Subcommand};
use kiln_core::domain::trigger::RunTrigger;
use std::path::PathBuf;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline for a push or a manual dispatch
    Run(RunArgs),
    /// Check whether a trigger would start a run (exit code 0 = yes, 1 = no)
    Evaluate {
        #[command(flatten)]
        trigger: TriggerArgs,
    },
    /// Show the resolved build configuration and packager command
    Plan,
    /// Write a default build definition
    Init {
        /// Output file
        #[arg(short, long, default_value = crate::config::DEFAULT_DEFINITION)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Inspect published artifacts
    Artifacts {
        #[command(subcommand)]
        command: ArtifactCommands,
    },
}

/// The event a run is started for
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TriggerArgs {
    /// Push to BRANCH (a refs/heads/ prefix is accepted)
    #[arg(long)]
    pub branch: Option<String>,

    /// Manual dispatch
    #[arg(long)]
    pub manual: bool,
}

impl TriggerArgs {
    pub fn into_trigger(self, commit: Option<String>) -> RunTrigger {
        match self.branch {
            Some(branch) => RunTrigger::Push { branch, commit },
            None => RunTrigger::ManualDispatch,
        }
    }
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Returns
/// Exit code for the process
pub async fn handle_command(command: Commands, config: &Config) -> Result<i32> {
    match command {
        Commands::Run(args) => run::handle_run_command(args, config).await,
        Commands::Evaluate { trigger } => evaluate::handle_evaluate_command(trigger, config),
        Commands::Plan => plan::handle_plan_command(config),
        Commands::Init { output, force } => init::handle_init_command(&output, force),
        Commands::Artifacts { command } => artifacts::handle_artifact_command(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    #[test]
    fn test_trigger_args() {
        let cli = TestCli::try_parse_from(["kiln", "evaluate", "--branch", "main"]).unwrap();
        let Commands::Evaluate { trigger } = cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(trigger.into_trigger(None), RunTrigger::push("main"));

        let cli = TestCli::try_parse_from(["kiln", "evaluate", "--manual"]).unwrap();
        let Commands::Evaluate { trigger } = cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(trigger.into_trigger(None), RunTrigger::ManualDispatch);
    }

    #[test]
    fn test_trigger_is_required_and_exclusive() {
        assert!(TestCli::try_parse_from(["kiln", "evaluate"]).is_err());
        assert!(
            TestCli::try_parse_from(["kiln", "evaluate", "--branch", "main", "--manual"]).is_err()
        );
    }

    #[test]
    fn test_run_with_commit() {
        let cli = TestCli::try_parse_from([
            "kiln",
            "run",
            "--branch",
            "main",
            "--commit",
            "abc123",
            "--store",
            "/srv/artifacts",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.store, "/srv/artifacts");
        assert_eq!(
            args.trigger.into_trigger(args.commit),
            RunTrigger::push_at("main", "abc123")
        );
    }

    #[test]
    fn test_commit_requires_branch() {
        assert!(
            TestCli::try_parse_from(["kiln", "run", "--manual", "--commit", "abc123"]).is_err()
        );
        assert!(TestCli::try_parse_from(["kiln", "run", "--commit", "abc123"]).is_err());
    }
}
