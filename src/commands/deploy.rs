//! Deploy command: run the pipeline once without listening
//!
//! The one-shot parameterization of the listener's trigger handling, for
//! provisioning a fresh host or verifying a config change.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::deploy::{DeployRecord, StepStatus};
use crate::preflight;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path)?;
    preflight::check(&config)?;

    let record = crate::deploy::run(&config)?;
    print_summary(&record);
    Ok(())
}

fn print_summary(record: &DeployRecord) {
    println!();
    for step in &record.steps {
        match &step.status {
            StepStatus::Success => {
                println!("  {} {}", "✓".green().bold(), step.label);
            }
            StepStatus::Failed(detail) => {
                println!(
                    "  {} {}: {}",
                    "⚠".yellow().bold(),
                    step.label,
                    detail.dimmed()
                );
            }
        }
    }

    println!();
    let failed = record.failed_steps();
    if failed == 0 {
        println!(
            "{} Deploy complete ({} steps)",
            "✓".green().bold(),
            record.steps.len()
        );
    } else {
        println!(
            "{} Deploy finished with {failed} failed step{}",
            "⚠".yellow().bold(),
            if failed == 1 { "" } else { "s" }
        );
    }
}
