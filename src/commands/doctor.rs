//! Doctor command: config and environment diagnosis
//!
//! Validates the config file and resolves every external tool the
//! configured pipeline would invoke, without touching anything.

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::preflight;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path)?;

    println!();
    println!("{}", "Tools".bold());
    println!("{}", "─".repeat(40).dimmed());

    let mut missing = 0usize;
    for tool in preflight::required_tools(&config) {
        match which::which(&tool) {
            Ok(path) => {
                println!(
                    "  {} {} {}",
                    "✓".green().bold(),
                    tool,
                    path.display().to_string().dimmed()
                );
            }
            Err(_) => {
                println!("  {} {} {}", "✗".red().bold(), tool, "not found".dimmed());
                missing += 1;
            }
        }
    }

    println!();
    println!("{}", "Source".bold());
    println!("{}", "─".repeat(40).dimmed());

    let root = config.source.root_dir();
    if root.join(".git").exists() {
        println!(
            "  {} {} {}",
            "✓".green().bold(),
            root.display(),
            "git repository".dimmed()
        );
    } else if root.exists() {
        println!(
            "  {} {} {}",
            "⚠".yellow().bold(),
            root.display(),
            "exists but is not a git repository".dimmed()
        );
    } else {
        println!(
            "  {} {} {}",
            "⚠".yellow().bold(),
            root.display(),
            "does not exist".dimmed()
        );
    }

    println!();
    println!(
        "  Listener: {}:{} (token {:?})",
        config.listener.bind, config.listener.port, config.listener.token
    );
    println!();

    if missing > 0 {
        bail!(
            "{missing} required tool{} missing",
            if missing == 1 { "" } else { "s" }
        );
    }

    println!("{} Ready to listen", "✓".green().bold());
    Ok(())
}
