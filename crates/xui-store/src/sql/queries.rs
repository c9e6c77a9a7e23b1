//! SQL statements against the x-ui schema.

/// All inbounds in a stable order.
pub const LOAD_INBOUNDS: &str = r#"
SELECT id, remark, port, protocol, settings
FROM inbounds
ORDER BY id
"#;

/// Per-client usage counters.
pub const LOAD_USAGE: &str = r#"
SELECT email, up, down
FROM client_traffics
"#;

/// Replace one inbound's settings document.
pub const UPDATE_SETTINGS: &str = r#"
UPDATE inbounds
SET settings = ?
WHERE id = ?
"#;

/// Mirror a client's expiry, quota and status into the usage table.
pub const UPDATE_CLIENT_ROW: &str = r#"
UPDATE client_traffics
SET expiry_time = ?, total = ?, enable = ?
WHERE email = ?
"#;

/// Zero a client's usage counters.
pub const RESET_USAGE: &str = r#"
UPDATE client_traffics
SET up = 0, down = 0
WHERE email = ?
"#;
