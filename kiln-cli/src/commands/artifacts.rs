//! Artifact command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use kiln_runner::ArtifactStoreConfig;
use kiln_runner::service::DirectoryPublisher;

/// Artifact subcommands
#[derive(Subcommand)]
pub enum ArtifactCommands {
    /// List published generations of an artifact in a directory store
    List {
        /// Artifact store directory
        #[arg(long, env = "KILN_STORE", default_value = "artifacts")]
        store: String,

        /// Artifact name
        #[arg(short, long, default_value = "Survey_Processor")]
        name: String,
    },
}

/// Handle artifact commands
pub fn handle_artifact_command(command: ArtifactCommands) -> Result<i32> {
    match command {
        ArtifactCommands::List { store, name } => list_generations(&store, &name),
    }
}

fn list_generations(store: &str, name: &str) -> Result<i32> {
    let root = match ArtifactStoreConfig::parse(store) {
        ArtifactStoreConfig::Directory(root) => root,
        ArtifactStoreConfig::Http(url) => {
            anyhow::bail!("Listing is only supported for directory stores, got {}", url)
        }
    };

    let generations = DirectoryPublisher::new(root).list_generations(name)?;

    if generations.is_empty() {
        println!("{}", format!("No generations of '{}' found.", name).yellow());
        return Ok(0);
    }

    println!(
        "{}",
        format!("Found {} generation(s) of '{}':", generations.len(), name).bold()
    );
    println!();
    for generation in generations {
        println!(
            "  {} {}  {} bytes  {}",
            format!("#{}", generation.generation).cyan(),
            generation.published_at.format("%Y-%m-%d %H:%M:%S UTC"),
            generation.size_bytes,
            generation.run_id.to_string().dimmed()
        );
        println!("     {}", generation.location.dimmed());
    }

    Ok(0)
}
