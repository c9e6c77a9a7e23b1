//! Tracing subscriber set-up from the `[logging]` section.

use std::io;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use xui_config::LoggingConfig;

/// Filter directive: base level followed by per-module overrides.
pub fn filter_directive(config: &LoggingConfig) -> String {
    let mut directive = config.level.as_deref().unwrap_or("info").to_string();
    let mut modules: Vec<_> = config.filters.iter().collect();
    modules.sort();
    for (module, level) in modules {
        directive.push(',');
        directive.push_str(module);
        directive.push('=');
        directive.push_str(level);
    }
    directive
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_new(filter_directive(config)).unwrap_or_else(|_| EnvFilter::new("info"));
    let writer = match config.output.as_deref() {
        Some("stdout") => BoxMakeWriter::new(io::stdout),
        _ => BoxMakeWriter::new(io::stderr),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let _ = match config.format.as_deref() {
        Some("json") => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
        Some("compact") => registry
            .with(fmt::layer().compact().with_writer(writer))
            .try_init(),
        _ => registry.with(fmt::layer().with_writer(writer)).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_lists_module_filters() {
        let mut config = LoggingConfig::default();
        assert_eq!(filter_directive(&config), "info");

        config.level = Some("debug".into());
        config.filters.insert("sqlx".into(), "warn".into());
        config.filters.insert("xui_store".into(), "trace".into());
        assert_eq!(filter_directive(&config), "debug,sqlx=warn,xui_store=trace");
    }
}
