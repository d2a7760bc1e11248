//! Init command handler
//!
//! Writes the default build definition so it can be edited in place.

use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

/// Handle `kiln init`
pub fn handle_init_command(output: &Path, force: bool) -> Result<i32> {
    write_definition(output, force)?;

    println!("{}", "✓ Build definition created!".green().bold());
    println!("  {} {}", "Created".green(), output.display());
    println!();
    println!("{}", "Next steps:".bold());
    println!("  1. Adjust the trigger branch and runtime version if needed");
    println!("  2. Review the packaging directive with {}", "kiln plan".cyan());
    println!("  3. Start a build with {}", "kiln run --manual".cyan());

    Ok(0)
}

fn write_definition(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    fs::write(output, kiln_lua::default_definition())
        .with_context(|| format!("Failed to write {}", output.display()))
}
