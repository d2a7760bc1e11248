//! Evaluate command handler

use anyhow::Result;
use colored::*;
use kiln_core::domain::trigger::evaluate_trigger;

use crate::commands::TriggerArgs;
use crate::config::Config;

/// Handle `kiln evaluate`
///
/// Exits with 0 when the trigger would start a run and 1 when it would not.
pub fn handle_evaluate_command(trigger: TriggerArgs, config: &Config) -> Result<i32> {
    let build = config.load_build_config()?;
    let trigger = trigger.into_trigger(None);

    if evaluate_trigger(&trigger, &build.trigger).should_start() {
        println!(
            "{} {} starts a run of '{}'",
            "✓".green().bold(),
            trigger.label().cyan(),
            build.name
        );
        Ok(0)
    } else {
        println!(
            "{} {} is not eligible (primary branch: {}, manual dispatch: {})",
            "-".yellow().bold(),
            trigger.label().cyan(),
            build.trigger.primary_branch.bold(),
            if build.trigger.manual_dispatch { "on" } else { "off" }
        );
        Ok(1)
    }
}
