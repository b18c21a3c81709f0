//! Pipeline configuration
//!
//! Deserialized from `respin.toml`. Every field of `[listener]` has a
//! default, so a config only needs a `[source]` section and at least one
//! `[[services]]` entry to be usable.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "respin.toml";
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 420;
pub const DEFAULT_TOKEN: &str = "reset";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listener: ListenerConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

/// Where the trigger listener binds and what payload fires it.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    /// Bind address. `127.0.0.1` restricts triggers to the local host.
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Payload that fires a redeploy. Any other payload is ignored.
    #[serde(default = "default_token")]
    pub token: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            token: DEFAULT_TOKEN.to_string(),
        }
    }
}

/// The working tree that gets stashed and pulled before redeploying.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Repository root. A leading `~` expands to the home directory.
    pub root: String,
    /// Run `git stash --include-untracked` before pulling.
    #[serde(default = "default_stash")]
    pub stash: bool,
}

impl SourceConfig {
    /// Repository root with `~` expanded.
    pub fn root_dir(&self) -> PathBuf {
        expand_home(&self.root)
    }
}

/// One service in the redeploy pipeline. Steps run in declaration order:
/// install, build, terminate prior instances, launch.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// Working directory for all steps, relative to `source.root`
    /// (absolute paths are used as-is).
    pub path: String,
    /// Dependency install command, e.g. `["npm", "install"]`. Empty = skip.
    #[serde(default)]
    pub install: Vec<String>,
    /// Build command, e.g. `["npm", "run", "build"]`. Empty = skip.
    #[serde(default)]
    pub build: Vec<String>,
    /// `pkill -f` patterns swept before launch, for instances that were
    /// not launched (and pid-tracked) by respin itself.
    #[serde(default)]
    pub kill_patterns: Vec<String>,
    /// Launch command, run detached in the background.
    pub launch: Vec<String>,
}

impl ServiceConfig {
    /// Resolve the service working directory against the source root.
    pub fn work_dir(&self, root: &Path) -> PathBuf {
        let path = expand_home(&self.path);
        if path.is_absolute() {
            path
        } else {
            root.join(path)
        }
    }
}

/// Errors from loading a config file. Validation errors are separate,
/// see [`Config::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Validation error with the service it applies to, if any.
#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
    pub service: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.service {
            write!(f, "Service '{}': {}", name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl Config {
    /// Load a config file. A missing file is an error; run `respin init`
    /// to create one.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Structural validation, collecting every problem instead of stopping
    /// at the first.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.listener.token.is_empty() {
            errors.push(ValidationError {
                message: "Trigger token cannot be empty".to_string(),
                service: None,
            });
        }

        if self.listener.port == 0 {
            errors.push(ValidationError {
                message: "Listener port cannot be 0".to_string(),
                service: None,
            });
        }

        if self.source.root.is_empty() {
            errors.push(ValidationError {
                message: "Source root cannot be empty".to_string(),
                service: None,
            });
        }

        if self.services.is_empty() {
            errors.push(ValidationError {
                message: "No services defined".to_string(),
                service: None,
            });
        }

        let mut seen_names = std::collections::HashSet::new();

        for service in &self.services {
            if service.name.is_empty() {
                errors.push(ValidationError {
                    message: "Service name cannot be empty".to_string(),
                    service: None,
                });
                continue;
            }

            if !seen_names.insert(&service.name) {
                errors.push(ValidationError {
                    message: "Duplicate service name".to_string(),
                    service: Some(service.name.clone()),
                });
            }

            if service.path.is_empty() {
                errors.push(ValidationError {
                    message: "Service path cannot be empty".to_string(),
                    service: Some(service.name.clone()),
                });
            }

            if service.launch.is_empty() {
                errors.push(ValidationError {
                    message: "Launch command cannot be empty".to_string(),
                    service: Some(service.name.clone()),
                });
            }

            for (label, step) in [("install", &service.install), ("build", &service.build)] {
                if step.iter().any(String::is_empty) {
                    errors.push(ValidationError {
                        message: format!("{label} command contains an empty argument"),
                        service: Some(service.name.clone()),
                    });
                }
            }

            if service.launch.iter().any(String::is_empty) {
                errors.push(ValidationError {
                    message: "launch command contains an empty argument".to_string(),
                    service: Some(service.name.clone()),
                });
            }

            if service.kill_patterns.iter().any(String::is_empty) {
                errors.push(ValidationError {
                    message: "Kill pattern cannot be empty".to_string(),
                    service: Some(service.name.clone()),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_token() -> String {
    DEFAULT_TOKEN.to_string()
}

fn default_stash() -> bool {
    true
}
