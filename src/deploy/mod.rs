//! Redeploy pipeline
//!
//! One deploy = refresh the working tree, then for each configured service
//! in order: install, build, terminate prior instances, launch detached.
//! A failing step is reported and logged but never aborts the pipeline;
//! the remaining steps run regardless, and the whole run is summarized in
//! a [`DeployRecord`] appended to the on-disk history.

pub mod service;
pub mod source;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

use crate::config::Config;
use crate::state::StateDir;

/// How one pipeline step went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Success,
    Failed(String),
}

impl StepStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed(_))
    }
}

/// One executed pipeline step, in execution order within a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub label: String,
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn success(label: &str) -> Self {
        Self {
            label: label.to_string(),
            status: StepStatus::Success,
        }
    }

    pub fn failed(label: &str, detail: String) -> Self {
        Self {
            label: label.to_string(),
            status: StepStatus::Failed(detail),
        }
    }
}

/// Everything that happened during one deploy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepOutcome>,
}

impl DeployRecord {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_failed()).count()
    }
}

/// Run the full pipeline once.
///
/// Fails only on environment problems (the state directory cannot be
/// created); step failures land in the returned record instead.
pub fn run(config: &Config) -> Result<DeployRecord> {
    let root = config.source.root_dir();
    let state = StateDir::new(&root);
    state.ensure()?;
    let mut registry = state.load_registry();

    let started_at = Utc::now();
    let mut steps = source::refresh_source(&root, config.source.stash);

    for svc in &config.services {
        steps.extend(service::redeploy(svc, &root, &state, &mut registry));
        // Persist after every service so a crash mid-pipeline keeps the
        // handles of everything launched so far.
        if let Err(e) = state.save_registry(&registry) {
            warn!("Failed to persist pid registry: {e:#}");
        }
    }

    let record = DeployRecord {
        started_at,
        finished_at: Utc::now(),
        steps,
    };

    if let Err(e) = state.append_record(&record) {
        warn!("Failed to append deploy history: {e:#}");
    }

    match record.failed_steps() {
        0 => info!("Redeploy finished: {} step(s) succeeded", record.steps.len()),
        failed => warn!(
            "Redeploy finished: {failed} of {} step(s) failed",
            record.steps.len()
        ),
    }

    Ok(record)
}

/// Run one external command to completion, capturing its output.
///
/// `cwd` of `None` inherits the listener's working directory (used by the
/// git wrappers, which carry `-C` instead).
pub(crate) fn run_command(label: &str, argv: &[String], cwd: Option<&Path>) -> StepOutcome {
    let Some((program, args)) = argv.split_first() else {
        return StepOutcome::failed(label, "empty command".to_string());
    };

    info!("Running {label}");

    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    match command.output() {
        Ok(output) if output.status.success() => StepOutcome::success(label),
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                format!("exited with {}", output.status)
            } else {
                format!("exited with {}: {}", output.status, stderr.trim())
            };
            warn!("{label} failed: {detail}");
            StepOutcome::failed(label, detail)
        }
        Err(e) => {
            let detail = format!("failed to execute '{program}': {e}");
            warn!("{label} failed: {detail}");
            StepOutcome::failed(label, detail)
        }
    }
}
