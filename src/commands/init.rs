//! Init command: write a starter config file.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::config::DEFAULT_CONFIG_FILE;

const CONFIG_TEMPLATE: &str = r#"# respin configuration
#
# A client that connects to the listener and sends the trigger token causes
# a redeploy: git stash + pull under [source], then for each [[services]]
# entry in order: install, build, terminate prior instances, launch.

[listener]
bind = "0.0.0.0"    # use "127.0.0.1" to accept local triggers only
port = 420
token = "reset"

[source]
root = "~/projects/totally_not_skynet"
stash = true         # stash local changes (including untracked) before pulling

[[services]]
name = "frontend"
path = "frontend"                  # relative to source.root
install = ["npm", "install"]
build = ["npm", "run", "build"]
kill_patterns = ["node", "npm"]    # pkill -f targets, swept before launch
launch = ["npm", "run", "start"]

[[services]]
name = "backend"
path = "backend"
launch = ["cargo", "run"]
"#;

pub fn execute(force: bool) -> Result<()> {
    write_template(Path::new(DEFAULT_CONFIG_FILE), force)?;
    println!("{} Wrote {}", "✓".green().bold(), DEFAULT_CONFIG_FILE);
    println!(
        "  {}",
        "Edit the source root and services, then run 'respin doctor'".dimmed()
    );
    Ok(())
}

pub(crate) fn write_template(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    std::fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))
}
