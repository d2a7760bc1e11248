//! Plan command handler
//!
//! Prints the resolved build configuration without running anything: what
//! triggers a run, which image is used, what gets installed and the exact
//! packager command line.

use anyhow::Result;
use colored::*;
use kiln_core::domain::config::BuildConfig;
use kiln_core::domain::directive::CapabilityCheck;

use crate::config::Config;

/// Handle `kiln plan`
pub fn handle_plan_command(config: &Config) -> Result<i32> {
    let build = config.load_build_config()?;
    print_plan(&build);
    Ok(0)
}

/// Packager command line as run inside the build container
fn packager_command(build: &BuildConfig) -> String {
    format!(
        "{} -m PyInstaller {}",
        build.environment.interpreter,
        build.directive.packager_args().join(" ")
    )
}

fn print_plan(build: &BuildConfig) {
    println!("{}", format!("Pipeline '{}'", build.name).bold());
    println!();

    println!("{}", "Trigger".bold());
    println!("  Push to:         {}", build.trigger.primary_branch.cyan());
    println!(
        "  Manual dispatch: {}",
        if build.trigger.manual_dispatch {
            "allowed".green()
        } else {
            "disabled".yellow()
        }
    );
    println!();

    println!("{}", "Source".bold());
    println!("  Repository: {}", build.source.repository);
    println!("  Entry point: {}", build.directive.script.display());
    println!();

    println!("{}", "Environment".bold());
    println!("  Image:   {}", build.environment.image().cyan());
    println!("  Runtime: {}", build.environment.runtime_version);
    println!();

    println!(
        "{}",
        format!("Dependencies ({})", build.dependencies.len()).bold()
    );
    for dependency in build.dependencies.packages() {
        println!(
            "  - {} {}",
            dependency.name.cyan(),
            format!("({})", dependency.kind).dimmed()
        );
        for module in &dependency.hidden_imports {
            println!("      hidden import {}", module.dimmed());
        }
        if dependency.collect_all {
            println!("      {}", "collect-all".dimmed());
        }
    }
    println!();

    println!("{}", "Packaging".bold());
    println!("  Command: {}", packager_command(build));
    println!(
        "  Output:  {}",
        build.directive.output_path(build.platform).display()
    );
    println!("  Artifact: {}", build.artifact_name.bold());

    let gaps = build.directive.capability_gaps(&build.dependencies);
    if !gaps.is_empty() {
        println!();
        let label = match build.capability_check {
            CapabilityCheck::Strict => "error".red().bold(),
            CapabilityCheck::Permissive => "warning".yellow().bold(),
        };
        for gap in gaps {
            println!("  {} directive is missing {}", label, gap);
        }
    }
}
