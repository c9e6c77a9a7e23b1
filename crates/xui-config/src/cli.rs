//! CLI override definitions and application logic.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;
use crate::types::RestartPolicy;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override the panel database path
    #[arg(long, global = true, env = "XUI_DB")]
    pub database: Option<PathBuf>,
    /// Override the backup directory
    #[arg(long, global = true)]
    pub backup_dir: Option<PathBuf>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    /// Override the restart policy after a commit
    #[arg(long, global = true, value_enum)]
    pub restart: Option<RestartPolicy>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.database {
        config.database.path = Some(v.clone());
    }
    if let Some(v) = &overrides.backup_dir {
        config.backup.dir = Some(v.clone());
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
    if let Some(v) = overrides.restart {
        config.panel.restart = v;
    }
}
