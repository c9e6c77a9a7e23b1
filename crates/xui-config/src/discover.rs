//! Locating the panel database.

use std::fs;
use std::path::{Path, PathBuf};

use crate::defaults::DEFAULT_DATABASE_PATH;
use crate::loader::ConfigError;

/// `*.db` files directly inside `dir`, sorted by name.
pub fn database_candidates(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "db") {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Resolve the database to open.
///
/// An explicit path wins. Otherwise `default` is used when it exists, then
/// the single `*.db` file in `dir`.
pub fn discover_database(
    explicit: Option<&Path>,
    default: &Path,
    dir: &Path,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if default.is_file() {
        return Ok(default.to_path_buf());
    }
    let mut candidates = database_candidates(dir)?;
    match candidates.len() {
        0 => Err(ConfigError::DatabaseNotFound),
        1 => Ok(candidates.remove(0)),
        _ => Err(ConfigError::AmbiguousDatabase(candidates)),
    }
}

/// [`discover_database`] with the installer path and the working directory.
pub fn resolve_database(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let cwd = std::env::current_dir()?;
    discover_database(explicit, Path::new(DEFAULT_DATABASE_PATH), &cwd)
}
