//! Inbound and client records decoded from the panel's settings documents.
//!
//! Each inbound row carries a JSON `settings` document whose `clients`
//! array holds the subscriber records. Only `expiryTime`, the quota and
//! `enable` are interpreted; every other key is carried through untouched.
//!
//! The quota is stored as `totalGB` by current panels and as `total` by
//! older ones. Decoding accepts either name, encoding always writes
//! `totalGB`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Bytes in one (binary) gigabyte.
pub const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Convert a gigabyte amount to bytes, rounding to the nearest byte.
///
/// Out-of-range values saturate at the `i64` bounds.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub fn gb_to_bytes(gb: f64) -> i64 {
    (gb * BYTES_PER_GB).round() as i64
}

/// Raw inbound row as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRow {
    pub id: i64,
    pub remark: String,
    pub port: i64,
    pub protocol: String,
    /// Settings document, JSON text.
    pub settings: String,
}

/// One subscriber record inside an inbound's settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireClient", into = "WireClient")]
pub struct ClientRecord {
    /// Identity. Records without an email are never touched.
    pub email: Option<String>,
    /// Absolute expiry in milliseconds since the epoch (`<= 0` = unlimited).
    pub expiry_time: i64,
    /// Absolute quota in bytes (`<= 0` = unlimited).
    pub total_quota_bytes: i64,
    pub enabled: bool,
    /// Every other key of the record, in document order.
    pub extra: Map<String, Value>,
}

impl ClientRecord {
    /// Create a record with the given identity and state and no extra keys.
    pub fn new(email: impl Into<String>, expiry_time: i64, total_quota_bytes: i64, enabled: bool) -> Self {
        Self {
            email: Some(email.into()),
            expiry_time,
            total_quota_bytes,
            enabled,
            extra: Map::new(),
        }
    }

    /// The record's email, or `""` when it has none.
    #[inline]
    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }

    /// `0 < expiryTime < now`.
    #[inline]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expiry_time > 0 && self.expiry_time < now
    }

    /// Finite quota that `consumed` has reached.
    #[inline]
    pub fn is_depleted(&self, consumed: i64) -> bool {
        self.total_quota_bytes > 0 && consumed >= self.total_quota_bytes
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireClient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    expiry_time: i64,
    #[serde(
        default,
        rename = "totalGB",
        deserialize_with = "lenient_opt_i64",
        skip_serializing_if = "Option::is_none"
    )]
    total_gb: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64", skip_serializing)]
    total: Option<i64>,
    #[serde(default)]
    enable: bool,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<WireClient> for ClientRecord {
    fn from(wire: WireClient) -> Self {
        Self {
            email: wire.email,
            expiry_time: wire.expiry_time,
            total_quota_bytes: wire.total_gb.or(wire.total).unwrap_or(0),
            enabled: wire.enable,
            extra: wire.extra,
        }
    }
}

impl From<ClientRecord> for WireClient {
    fn from(record: ClientRecord) -> Self {
        Self {
            email: record.email,
            expiry_time: record.expiry_time,
            total_gb: Some(record.total_quota_bytes),
            total: None,
            enable: record.enabled,
            extra: record.extra,
        }
    }
}

/// Panels occasionally write integral numbers as floats (`1.7e12`) or null.
#[allow(clippy::cast_possible_truncation)]
fn number_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => number_to_i64(&v)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a number, found {v}"))),
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_opt_i64(deserializer).map(Option::unwrap_or_default)
}

/// Decoded settings document of one inbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundSettings {
    #[serde(default)]
    pub clients: Vec<ClientRecord>,
    /// Protocol-specific keys (`decryption`, `fallbacks`, ...), untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InboundSettings {
    /// Decode a settings document.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encode back to JSON text.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// An inbound with its decoded client collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub id: i64,
    pub remark: String,
    pub port: i64,
    pub protocol: String,
    pub settings: InboundSettings,
}

impl Inbound {
    /// Decode a raw storage row.
    pub fn decode(row: InboundRow) -> Result<Self, StoreError> {
        let settings = InboundSettings::decode(&row.settings).map_err(|e| StoreError::Malformed {
            inbound_id: row.id,
            reason: e.to_string(),
        })?;
        Ok(Self {
            id: row.id,
            remark: row.remark,
            port: row.port,
            protocol: row.protocol,
            settings,
        })
    }

    #[inline]
    pub fn clients(&self) -> &[ClientRecord] {
        &self.settings.clients
    }

    /// Index of the first client with the given email.
    pub fn position(&self, email: &str) -> Option<usize> {
        self.settings
            .clients
            .iter()
            .position(|c| !email.is_empty() && c.email() == email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_current_quota_name() {
        let settings = InboundSettings::decode(
            r#"{"clients":[{"id":"u1","email":"a@x","expiryTime":1700000000000,"totalGB":1073741824,"enable":true}]}"#,
        )
        .unwrap();
        let client = &settings.clients[0];
        assert_eq!(client.email(), "a@x");
        assert_eq!(client.expiry_time, 1_700_000_000_000);
        assert_eq!(client.total_quota_bytes, 1_073_741_824);
        assert!(client.enabled);
        assert_eq!(client.extra.get("id"), Some(&json!("u1")));
    }

    #[test]
    fn decodes_legacy_quota_name_and_encodes_current() {
        let settings =
            InboundSettings::decode(r#"{"clients":[{"email":"b@x","total":500,"enable":false}]}"#).unwrap();
        assert_eq!(settings.clients[0].total_quota_bytes, 500);

        let encoded: Value = serde_json::from_str(&settings.encode().unwrap()).unwrap();
        let client = &encoded["clients"][0];
        assert_eq!(client["totalGB"], json!(500));
        assert!(client.get("total").is_none());
    }

    #[test]
    fn current_name_wins_over_legacy() {
        let settings =
            InboundSettings::decode(r#"{"clients":[{"email":"c@x","total":1,"totalGB":2}]}"#).unwrap();
        assert_eq!(settings.clients[0].total_quota_bytes, 2);
    }

    #[test]
    fn tolerates_float_and_null_numbers() {
        let settings = InboundSettings::decode(
            r#"{"clients":[{"email":"d@x","expiryTime":1.7e12,"totalGB":null}]}"#,
        )
        .unwrap();
        assert_eq!(settings.clients[0].expiry_time, 1_700_000_000_000);
        assert_eq!(settings.clients[0].total_quota_bytes, 0);
        assert!(!settings.clients[0].enabled);
    }

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let text = r#"{"clients":[{"email":"e@x","flow":"xtls-rprx-vision","limitIp":2,"subId":"s"}],"decryption":"none","fallbacks":[]}"#;
        let settings = InboundSettings::decode(text).unwrap();
        let again = InboundSettings::decode(&settings.encode().unwrap()).unwrap();
        assert_eq!(settings, again);
        assert_eq!(again.extra.get("decryption"), Some(&json!("none")));
        assert_eq!(again.clients[0].extra.get("limitIp"), Some(&json!(2)));
    }

    #[test]
    fn rejects_non_object_document() {
        let row = InboundRow {
            id: 9,
            remark: String::new(),
            port: 0,
            protocol: "vless".into(),
            settings: "[1,2]".into(),
        };
        assert!(matches!(
            Inbound::decode(row),
            Err(StoreError::Malformed { inbound_id: 9, .. })
        ));
    }

    #[test]
    fn gb_conversion_rounds() {
        assert_eq!(gb_to_bytes(1.0), 1_073_741_824);
        assert_eq!(gb_to_bytes(0.5), 536_870_912);
        assert_eq!(gb_to_bytes(f64::MAX), i64::MAX);
    }
}
