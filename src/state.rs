//! Persistent listener state
//!
//! Everything respin remembers between deploys lives under
//! `<source.root>/.respin/`: the pid registry for launched services, the
//! append-only deploy history, and the per-service launch log sinks.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::deploy::DeployRecord;

pub const STATE_DIR_NAME: &str = ".respin";
const SERVICES_FILE: &str = "services.json";
const HISTORY_FILE: &str = "deploys.jsonl";
const LOGS_DIR: &str = "logs";

/// A service instance launched by a previous deploy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchedService {
    pub pid: u32,
    pub launched_at: DateTime<Utc>,
}

/// Pid registry: service name -> last launched instance.
///
/// Tracked handles let the pipeline terminate exactly the process it
/// launched instead of relying on name patterns alone.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ServiceRegistry {
    #[serde(default)]
    pub services: HashMap<String, LaunchedService>,
}

impl ServiceRegistry {
    pub fn get(&self, name: &str) -> Option<&LaunchedService> {
        self.services.get(name)
    }

    pub fn record(&mut self, name: &str, pid: u32) {
        self.services.insert(
            name.to_string(),
            LaunchedService {
                pid,
                launched_at: Utc::now(),
            },
        );
    }
}

/// Handle on the `.respin/` state directory.
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(source_root: &Path) -> Self {
        Self {
            root: source_root.join(STATE_DIR_NAME),
        }
    }

    /// Create the state directory tree if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(self.root.join(LOGS_DIR)).with_context(|| {
            format!("Failed to create state directory {}", self.root.display())
        })?;
        self.ensure_git_excluded();
        Ok(())
    }

    /// Keep the state directory out of git's view. `git stash
    /// --include-untracked` stashes untracked files but leaves ignored ones
    /// alone; without this entry every refresh would carry `.respin/` into
    /// the stash and delete the registry and logs from the working tree.
    fn ensure_git_excluded(&self) {
        let Some(source_root) = self.root.parent() else {
            return;
        };
        if !source_root.join(".git").exists() {
            return;
        }

        let info_dir = source_root.join(".git").join("info");
        let exclude = info_dir.join("exclude");
        let line = format!("{STATE_DIR_NAME}/");

        let mut content = fs::read_to_string(&exclude).unwrap_or_default();
        if content.lines().any(|l| l.trim() == line) {
            return;
        }

        if fs::create_dir_all(&info_dir).is_err() {
            return;
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&line);
        content.push('\n');
        if let Err(e) = fs::write(&exclude, content) {
            warn!("Failed to add {line} to {}: {e}", exclude.display());
        }
    }

    pub fn service_log(&self, name: &str) -> PathBuf {
        self.root.join(LOGS_DIR).join(format!("{name}.log"))
    }

    fn services_file(&self) -> PathBuf {
        self.root.join(SERVICES_FILE)
    }

    fn history_file(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }

    /// Load the pid registry. A missing or unreadable file is treated as an
    /// empty registry, never as a fatal error: the worst case is that a
    /// stale instance is only caught by the pattern sweep.
    pub fn load_registry(&self) -> ServiceRegistry {
        let path = self.services_file();
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt registry {}: {e}", path.display());
                ServiceRegistry::default()
            }),
            Err(_) => ServiceRegistry::default(),
        }
    }

    pub fn save_registry(&self, registry: &ServiceRegistry) -> Result<()> {
        let path = self.services_file();
        let content =
            serde_json::to_string_pretty(registry).context("Failed to serialize registry")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write registry {}", path.display()))
    }

    /// Append one deploy record to the JSONL history.
    pub fn append_record(&self, record: &DeployRecord) -> Result<()> {
        let path = self.history_file();
        let line = serde_json::to_string(record).context("Failed to serialize deploy record")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open history {}", path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("Failed to append to history {}", path.display()))
    }

    /// The most recent deploy record, if any. Unparseable lines are skipped.
    pub fn last_record(&self) -> Option<DeployRecord> {
        let content = fs::read_to_string(self.history_file()).ok()?;
        content
            .lines()
            .rev()
            .find_map(|line| serde_json::from_str(line).ok())
    }
}
