//! CLI command implementations.

pub mod deploy;
pub mod doctor;
pub mod init;
pub mod listen;
pub mod status;
pub mod trigger;

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::config::{Config, DEFAULT_CONFIG_FILE};

/// Load and validate the config for a command, defaulting to
/// `./respin.toml`.
pub(crate) fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = Config::load(&path)?;

    if let Err(errors) = config.validate() {
        let details = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n  ");
        bail!("Invalid configuration in {}:\n  {details}", path.display());
    }

    Ok(config)
}
