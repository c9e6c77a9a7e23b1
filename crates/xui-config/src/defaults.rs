//! Default value functions for serde deserialization.

/// Database the panel installer writes.
pub const DEFAULT_DATABASE_PATH: &str = "/etc/x-ui/x-ui.db";
/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "xui-bulk.toml";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 1;
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SERVICE: &str = "x-ui";
pub const DEFAULT_DAYS_TO_ADD: i64 = 30;
pub const DEFAULT_GB_TO_ADD: f64 = 0.0;

macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                $const_name
            }
        )*
    };
}

default_fns! {
    default_max_connections   => DEFAULT_MAX_CONNECTIONS: u32,
    default_busy_timeout_secs => DEFAULT_BUSY_TIMEOUT_SECS: u64,
    default_days_to_add       => DEFAULT_DAYS_TO_ADD: i64,
    default_gb_to_add         => DEFAULT_GB_TO_ADD: f64,
}

pub(crate) fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}
