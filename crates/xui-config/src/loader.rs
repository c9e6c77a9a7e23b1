//! Configuration file loading and error types.

use std::{fs, io, path::Path, path::PathBuf};

use crate::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config format")]
    UnsupportedFormat,
    #[error("validation: {0}")]
    Validation(String),
    #[error("no x-ui database found")]
    DatabaseNotFound,
    #[error("several databases found: {0:?}")]
    AmbiguousDatabase(Vec<PathBuf>),
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()).unwrap_or("") {
        "json" | "jsonc" => {
            let stripped = json_comments::StripComments::new(data.as_bytes());
            Ok(serde_json::from_reader(stripped)?)
        }
        "yaml" | "yml" => Ok(serde_yaml::from_str(&data)?),
        "toml" => Ok(toml::from_str(&data)?),
        _ => Err(ConfigError::UnsupportedFormat),
    }
}

/// Load `path`, falling back to defaults when it does not exist.
///
/// Used for the implicit default config file; an explicitly named file
/// goes through [`load_config`] so that a typo is an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    match load_config(path) {
        Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
        other => other,
    }
}
