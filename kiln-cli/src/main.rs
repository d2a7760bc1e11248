//! Kiln CLI
//!
//! Command-line interface for running the survey processor build pipeline
//! on this machine.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Kiln build pipeline CLI", long_about = None)]
struct Cli {
    /// Build definition file (defaults to ./kiln.lua when present)
    #[arg(short = 'f', long, env = "KILN_DEFINITION")]
    definition: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kiln=info,kiln_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        definition: cli.definition,
    };

    let exit_code = handle_command(cli.command, &config).await?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}
