//! SQLite adapter for x-ui panel databases.
//!
//! The panel keeps client state twice: inside the `settings` JSON of each
//! `inbounds` row and, normalized, in `client_traffics`. This adapter reads
//! both and writes both in one transaction.
//!
//! # Example
//!
//! ```ignore
//! use xui_store::sql::{SqlitePanelStore, SqliteStoreConfig};
//!
//! let store = SqlitePanelStore::connect(
//!     SqliteStoreConfig::new("/etc/x-ui/x-ui.db").backup_dir("/var/backups/x-ui"),
//! )
//! .await?;
//! let inbounds = store.load_inbounds().await?;
//! ```
//!
//! # Tables used
//!
//! ```sql
//! CREATE TABLE inbounds (
//!     id INTEGER PRIMARY KEY,
//!     remark TEXT,
//!     port INTEGER,
//!     protocol TEXT,
//!     settings TEXT            -- JSON, {"clients": [...], ...}
//! );
//!
//! CREATE TABLE client_traffics (
//!     id INTEGER PRIMARY KEY,
//!     inbound_id INTEGER,
//!     enable INTEGER,
//!     email TEXT UNIQUE,
//!     up INTEGER,
//!     down INTEGER,
//!     expiry_time INTEGER,
//!     total INTEGER
//! );
//! ```

mod backend;
mod config;
mod queries;


pub use backend::SqlitePanelStore;
pub use config::SqliteStoreConfig;
