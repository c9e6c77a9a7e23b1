//! Text rendering of inbounds, clients and planned changes.

use tabled::{Table, Tabled};
use time::OffsetDateTime;
use time::macros::format_description;
use xui_engine::{ApplySummary, PlannedChange, RecordChange};
use xui_store::{BYTES_PER_GB, RecordStore, UsageIndex};

/// Marker shown in front of an inbound's protocol.
pub fn protocol_icon(protocol: &str) -> &'static str {
    match protocol {
        "vmess" => "🟣",
        "vless" => "🔵",
        "trojan" => "🟢",
        "shadowsocks" => "🟠",
        "dokodemo-door" => "🚪",
        "socks" => "🧦",
        "http" => "🌐",
        _ => "📡",
    }
}

/// Bytes as GB with two decimals; non-positive values render as zero.
#[allow(clippy::cast_precision_loss)]
pub fn format_gb(bytes: i64) -> String {
    if bytes <= 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", bytes as f64 / BYTES_PER_GB)
}

/// A quota in GB, `∞` when unlimited.
pub fn format_quota(bytes: i64) -> String {
    if bytes <= 0 {
        "∞".to_string()
    } else {
        format_gb(bytes)
    }
}

/// An expiry timestamp (ms) as a UTC date, `unlimited` when not set.
pub fn format_expiry(expiry_time: i64) -> String {
    if expiry_time <= 0 {
        return "unlimited".to_string();
    }
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(expiry_time) * 1_000_000)
        .ok()
        .and_then(|at| at.format(format_description!("[year]-[month]-[day]")).ok())
        .unwrap_or_else(|| expiry_time.to_string())
}

fn format_enabled(enabled: bool) -> String {
    if enabled { "🟢 yes" } else { "🔴 no" }.to_string()
}

#[derive(Tabled)]
struct InboundDisplay {
    #[tabled(rename = "#")]
    code: String,
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Inbound")]
    remark: String,
    #[tabled(rename = "Port")]
    port: i64,
    #[tabled(rename = "Clients")]
    clients: String,
}

/// Table of inbounds. With `numbered`, rows carry menu codes starting at 2.
pub fn inbounds_table(records: &RecordStore, numbered: bool) -> String {
    let mut rows: Vec<InboundDisplay> = records
        .inbounds()
        .iter()
        .enumerate()
        .map(|(i, inbound)| InboundDisplay {
            code: if numbered { (i + 2).to_string() } else { "-".into() },
            id: inbound.id,
            remark: format!(
                "{} {} {}",
                protocol_icon(&inbound.protocol),
                inbound.protocol,
                inbound.remark
            ),
            port: inbound.port,
            clients: inbound.clients().len().to_string(),
        })
        .collect();
    rows.extend(records.malformed().iter().map(|m| InboundDisplay {
        code: "-".into(),
        id: m.id,
        remark: format!("{} {} {}", protocol_icon(&m.protocol), m.protocol, m.remark),
        port: 0,
        clients: "malformed".into(),
    }));
    Table::new(rows).to_string()
}

/// A client listed by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMatch {
    pub inbound_id: i64,
    pub email: String,
    pub expiry_time: i64,
    pub total_quota_bytes: i64,
    pub enabled: bool,
}

/// Clients whose email contains `query` (case-insensitive), optionally
/// restricted to one inbound.
pub fn find_clients(records: &RecordStore, inbound: Option<i64>, query: &str) -> Vec<ClientMatch> {
    let needle = query.trim().to_lowercase();
    records
        .inbounds()
        .iter()
        .filter(|i| inbound.is_none_or(|id| id == i.id))
        .flat_map(|i| i.clients().iter().map(move |c| (i.id, c)))
        .filter(|(_, c)| !c.email().is_empty() && c.email().to_lowercase().contains(&needle))
        .map(|(inbound_id, c)| ClientMatch {
            inbound_id,
            email: c.email().to_string(),
            expiry_time: c.expiry_time,
            total_quota_bytes: c.total_quota_bytes,
            enabled: c.enabled,
        })
        .collect()
}

#[derive(Tabled)]
struct ClientDisplay {
    #[tabled(rename = "#")]
    row: usize,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Inbound")]
    inbound: i64,
    #[tabled(rename = "Expiry")]
    expiry: String,
    #[tabled(rename = "Used/Total GB")]
    usage: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

pub fn clients_table(matches: &[ClientMatch], usage: &UsageIndex) -> String {
    let rows = matches.iter().enumerate().map(|(i, m)| ClientDisplay {
        row: i + 1,
        email: m.email.clone(),
        inbound: m.inbound_id,
        expiry: format_expiry(m.expiry_time),
        usage: format!(
            "{}/{}",
            format_gb(usage.consumed(&m.email)),
            format_quota(m.total_quota_bytes)
        ),
        enabled: format_enabled(m.enabled),
    });
    Table::new(rows).to_string()
}

/// One-paragraph card for a single client.
pub fn client_card(m: &ClientMatch, usage: &UsageIndex) -> String {
    format!(
        "📧 {}\n📊 {} | 📅 {}\n💾 {} / {} GB",
        m.email,
        if m.enabled { "🟢 enabled" } else { "🔴 disabled" },
        format_expiry(m.expiry_time),
        format_gb(usage.consumed(&m.email)),
        format_quota(m.total_quota_bytes),
    )
}

fn arrow<T: PartialEq + Copy>(before: T, after: T, fmt: impl Fn(T) -> String) -> String {
    if before == after {
        fmt(before)
    } else {
        format!("{} → {}", fmt(before), fmt(after))
    }
}

#[derive(Tabled)]
struct ChangeDisplay {
    #[tabled(rename = "Inbound")]
    inbound: i64,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Expiry")]
    expiry: String,
    #[tabled(rename = "Quota GB")]
    quota: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Reset")]
    reset: String,
}

impl From<&RecordChange> for ChangeDisplay {
    fn from(change: &RecordChange) -> Self {
        Self {
            inbound: change.inbound_id,
            email: change.email.clone(),
            expiry: arrow(change.expiry_before, change.expiry_after, format_expiry),
            quota: arrow(change.quota_before, change.quota_after, format_quota),
            enabled: arrow(change.enabled_before, change.enabled_after, format_enabled),
            reset: if change.resets_usage() { "yes" } else { "" }.to_string(),
        }
    }
}

/// Per-record preview of a plan.
pub fn changes_table(plan: &PlannedChange) -> String {
    Table::new(plan.changes.iter().map(ChangeDisplay::from)).to_string()
}

pub fn plan_summary(plan: &PlannedChange) -> String {
    let mut text = format!(
        "changes: {} | newly enabled: {} | usage resets: {}",
        plan.processed_count, plan.enabled_count, plan.reset_count
    );
    if !plan.skipped_inbounds.is_empty() {
        text.push_str(&format!(" | skipped malformed inbounds: {:?}", plan.skipped_inbounds));
    }
    text
}

pub fn apply_summary(summary: &ApplySummary) -> String {
    let mut text = format!(
        "saved: {} changes | newly enabled: {} | usage resets: {} | inbounds rewritten: {}",
        summary.processed, summary.enabled, summary.resets, summary.documents_written
    );
    if summary.rows_missing > 0 {
        text.push_str(&format!(" | clients without usage row: {}", summary.rows_missing));
    }
    if let Some(path) = &summary.backup {
        text.push_str(&format!("\nbackup: {}", path.display()));
    }
    text
}
