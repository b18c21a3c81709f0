//! Status command: tracked service processes and the last deploy.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::process::is_process_alive;
use crate::state::StateDir;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let root = config.source.root_dir();
    let state = StateDir::new(&root);
    let registry = state.load_registry();

    println!();
    println!("{}", "Services".bold());
    println!("{}", "─".repeat(40).dimmed());

    for service in &config.services {
        match registry.get(&service.name) {
            Some(entry) if is_process_alive(entry.pid) => {
                println!(
                    "  {} {} {}",
                    "✓".green().bold(),
                    service.name,
                    format!("pid {}, launched {}", entry.pid, entry.launched_at.format("%Y-%m-%d %H:%M:%S UTC")).dimmed()
                );
            }
            Some(entry) => {
                println!(
                    "  {} {} {}",
                    "✗".red().bold(),
                    service.name,
                    format!("pid {} is gone", entry.pid).dimmed()
                );
            }
            None => {
                println!(
                    "  {} {} {}",
                    "─".dimmed(),
                    service.name,
                    "never launched".dimmed()
                );
            }
        }
    }

    println!();
    println!("{}", "Last deploy".bold());
    println!("{}", "─".repeat(40).dimmed());

    match state.last_record() {
        Some(record) => {
            let failed = record.failed_steps();
            let symbol = if failed == 0 {
                "✓".green().bold()
            } else {
                "⚠".yellow().bold()
            };
            println!(
                "  {} {} {}",
                symbol,
                record.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
                format!("{} step(s), {failed} failed", record.steps.len()).dimmed()
            );
        }
        None => {
            println!("  {} No deploys recorded", "─".dimmed());
        }
    }
    println!();

    Ok(())
}
