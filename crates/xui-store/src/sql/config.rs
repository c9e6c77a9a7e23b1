//! SQLite adapter configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::backup::BackupMethod;

/// Configuration for [`SqlitePanelStore`](super::SqlitePanelStore).
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Database file path, or a `sqlite:` URL.
    pub database: String,

    /// Maximum number of pooled connections.
    pub max_connections: u32,

    /// How long a statement waits on a locked database.
    pub busy_timeout: Duration,

    /// Backup directory (defaults to the database's directory).
    pub backup_dir: Option<PathBuf>,

    /// How backups are taken.
    pub backup_method: BackupMethod,
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
            backup_dir: None,
            backup_method: BackupMethod::default(),
        }
    }
}

impl SqliteStoreConfig {
    /// Create a new config with just the database location.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    /// Builder: set max connections.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    /// Builder: set busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Builder: set backup directory.
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    /// Builder: set backup method.
    pub fn backup_method(mut self, method: BackupMethod) -> Self {
        self.backup_method = method;
        self
    }

    /// Whether `database` is a URL rather than a file path.
    pub(crate) fn is_url(&self) -> bool {
        self.database.starts_with("sqlite:")
    }

    /// Filesystem path of the database, when it has one.
    pub(crate) fn file_path(&self) -> Option<PathBuf> {
        if !self.is_url() {
            return Some(PathBuf::from(&self.database));
        }
        let rest = self.database.trim_start_matches("sqlite:").trim_start_matches("//");
        let rest = rest.split('?').next().unwrap_or_default();
        if rest.is_empty() || rest == ":memory:" {
            None
        } else {
            Some(PathBuf::from(rest))
        }
    }
}
