//! Startup tool checks
//!
//! The pipeline shells out to git, pkill, and whatever the configured
//! steps name. Resolving all of them on PATH before the socket is bound
//! turns a doomed deploy into an immediate startup error.

use anyhow::{bail, Result};
use std::collections::BTreeSet;

use crate::config::Config;

/// Every external program the configured pipeline will invoke.
pub fn required_tools(config: &Config) -> Vec<String> {
    let mut tools = BTreeSet::new();
    tools.insert("git".to_string());

    if config
        .services
        .iter()
        .any(|s| !s.kill_patterns.is_empty())
    {
        tools.insert("pkill".to_string());
    }

    for service in &config.services {
        for step in [&service.install, &service.build, &service.launch] {
            if let Some(program) = step.first() {
                tools.insert(program.clone());
            }
        }
    }

    tools.into_iter().collect()
}

/// The subset of [`required_tools`] that does not resolve on PATH.
pub fn missing_tools(config: &Config) -> Vec<String> {
    required_tools(config)
        .into_iter()
        .filter(|tool| which::which(tool).is_err())
        .collect()
}

/// Fail fast when a required tool is missing.
pub fn check(config: &Config) -> Result<()> {
    let missing = missing_tools(config);
    if !missing.is_empty() {
        bail!("Missing required tools on PATH: {}", missing.join(", "));
    }
    Ok(())
}
