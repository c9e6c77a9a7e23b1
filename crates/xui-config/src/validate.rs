//! Configuration validation logic.

use crate::Config;
use crate::loader::ConfigError;

const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];
const LOG_OUTPUTS: [&str; 2] = ["stderr", "stdout"];

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be > 0".into(),
        ));
    }
    if config.database.busy_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "database.busy_timeout_secs must be > 0".into(),
        ));
    }
    if let Some(path) = &config.database.path
        && path.as_os_str().is_empty()
    {
        return Err(ConfigError::Validation("database.path is empty".into()));
    }
    if config.panel.service.trim().is_empty() {
        return Err(ConfigError::Validation("panel.service is empty".into()));
    }
    if config.defaults.days_to_add < 0 {
        return Err(ConfigError::Validation(
            "defaults.days_to_add must be >= 0".into(),
        ));
    }
    if !config.defaults.gb_to_add.is_finite() || config.defaults.gb_to_add < 0.0 {
        return Err(ConfigError::Validation(
            "defaults.gb_to_add must be a finite value >= 0".into(),
        ));
    }
    if let Some(format) = &config.logging.format
        && !LOG_FORMATS.contains(&format.as_str())
    {
        return Err(ConfigError::Validation(format!(
            "logging.format must be one of: {LOG_FORMATS:?}"
        )));
    }
    if let Some(output) = &config.logging.output
        && !LOG_OUTPUTS.contains(&output.as_str())
    {
        return Err(ConfigError::Validation(format!(
            "logging.output must be one of: {LOG_OUTPUTS:?}"
        )));
    }
    Ok(())
}
