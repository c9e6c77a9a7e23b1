//! Configuration type definitions for the database, backups, panel service,
//! bulk defaults and logging.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub panel: PanelConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Panel database; discovered when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

/// How the pre-commit snapshot is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMethodConfig {
    /// `VACUUM INTO`, consistent even with a live panel.
    #[default]
    Vacuum,
    /// Plain file copy.
    Copy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory for backups (default: next to the database).
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub method: BackupMethodConfig,
}

/// Whether to restart the panel after a successful commit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RestartPolicy {
    #[default]
    Ask,
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// systemd unit restarted when the `x-ui` helper is not installed.
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default)]
    pub restart: RestartPolicy,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            restart: RestartPolicy::default(),
        }
    }
}

/// Values offered by the interactive prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_days_to_add")]
    pub days_to_add: i64,
    #[serde(default = "default_gb_to_add")]
    pub gb_to_add: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            days_to_add: default_days_to_add(),
            gb_to_add: default_gb_to_add(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
    /// Output target: stdout or stderr. Default: stderr.
    pub output: Option<String>,
    /// Per-module log level filters (e.g., {"sqlx": "warn"}).
    #[serde(default)]
    pub filters: HashMap<String, String>,
}
