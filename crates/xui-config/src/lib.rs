//! Configuration loading, CLI overrides and database discovery.

mod cli;
pub mod defaults;
mod discover;
mod loader;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use discover::{database_candidates, discover_database, resolve_database};
pub use loader::{ConfigError, load_config, load_or_default};
pub use types::*;
pub use validate::validate_config;
