//! End-to-end reconciliation passes against in-memory and SQLite stores.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use xui_engine::{
    BulkScenario, EngineError, ManualAction, Operation, Reconciler, Scope, TimeAxis, TrafficAxis,
};
use xui_store::memory::ClientTraffic;
use xui_store::sql::{SqlitePanelStore, SqliteStoreConfig};
use xui_store::{InboundSettings, MILLIS_PER_DAY, MemoryPanelStore, PanelStore, StoreError};

const NOW: i64 = 1_700_000_000_000;
const GB: i64 = 1 << 30;

fn client(email: &str, expiry: i64, total: i64, enable: bool) -> String {
    format!(r#"{{"email":"{email}","id":"{email}-uuid","flow":"","expiryTime":{expiry},"totalGB":{total},"enable":{enable}}}"#)
}

fn doc(clients: &[String]) -> String {
    format!(r#"{{"clients":[{}],"decryption":"none","fallbacks":[]}}"#, clients.join(","))
}

/// Two inbounds covering expired, active, depleted and unlimited clients.
fn panel() -> MemoryPanelStore {
    MemoryPanelStore::default()
        .with_inbound(
            1,
            "vless",
            &doc(&[
                client("expired", NOW - 1000, 0, false),
                client("active", NOW + 100_000, 0, true),
            ]),
        )
        .with_inbound(
            2,
            "vmess",
            &doc(&[
                client("depleted", 0, GB, false),
                client("unlimited", 0, 0, true),
            ]),
        )
        .with_traffic(ClientTraffic::new("expired", 10, 10).mirror(NOW - 1000, 0, false))
        .with_traffic(ClientTraffic::new("active", 10, 10).mirror(NOW + 100_000, 0, true))
        .with_traffic(ClientTraffic::new("depleted", GB, GB).mirror(0, GB, false))
        .with_traffic(ClientTraffic::new("unlimited", 5 * GB, 0).mirror(0, 0, true))
}

/// Every client in a document matches its usage-table row.
fn assert_mirrored(store: &MemoryPanelStore) {
    for row in store.snapshot().inbounds {
        let settings = InboundSettings::decode(&row.settings).unwrap();
        for c in &settings.clients {
            let traffic = store.traffic(c.email()).unwrap();
            assert_eq!(traffic.expiry_time, c.expiry_time, "expiry of {}", c.email());
            assert_eq!(traffic.total, c.total_quota_bytes, "quota of {}", c.email());
            assert_eq!(traffic.enable, c.enabled, "enable of {}", c.email());
        }
    }
}

fn client_of(store: &MemoryPanelStore, inbound: i64, email: &str) -> xui_store::ClientRecord {
    let settings = InboundSettings::decode(&store.settings(inbound).unwrap()).unwrap();
    settings
        .clients
        .into_iter()
        .find(|c| c.email() == email)
        .unwrap()
}

async fn run(reconciler: &Reconciler<MemoryPanelStore>, scope: &Scope, op: &Operation) -> Result<xui_engine::ApplySummary, EngineError> {
    let snapshot = reconciler.load().await?;
    let plan = snapshot.evaluate(scope, op, NOW)?;
    reconciler.apply(&plan).await
}

#[tokio::test]
async fn expired_only_extends_from_now() {
    let reconciler = Reconciler::new(panel());
    let op = Operation::Bulk(BulkScenario::new().time(TimeAxis::ExpiredOnly, 30));
    let summary = run(&reconciler, &Scope::AllInbounds, &op).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.enabled, 1);
    let store = reconciler.store();
    let expired = client_of(store, 1, "expired");
    assert_eq!(expired.expiry_time, NOW + 30 * MILLIS_PER_DAY);
    assert!(expired.enabled);
    assert_eq!(client_of(store, 1, "active").expiry_time, NOW + 100_000);
    // inbound 2 had nothing to change
    assert_eq!(store.settings(2), panel().settings(2));
    assert_mirrored(store);
}

#[tokio::test]
async fn zero_delta_pass_is_idempotent_across_clock_ticks() {
    let reconciler = Reconciler::new(panel());
    let op = Operation::Bulk(
        BulkScenario::new()
            .time(TimeAxis::All, 0)
            .traffic(TrafficAxis::All, 0.0),
    );

    run(&reconciler, &Scope::AllInbounds, &op).await.unwrap();
    let after_first = reconciler.store().snapshot();
    assert_eq!(client_of(reconciler.store(), 2, "unlimited").expiry_time, 0);
    assert_eq!(client_of(reconciler.store(), 1, "expired").expiry_time, NOW - 1000);

    for now in [NOW, NOW + 1, NOW + MILLIS_PER_DAY] {
        let snapshot = reconciler.load().await.unwrap();
        let plan = snapshot.evaluate(&Scope::AllInbounds, &op, now).unwrap();
        assert!(plan.is_empty(), "pass at {now}");
        assert_eq!(plan.processed_count, 0);

        let summary = reconciler.apply(&plan).await.unwrap();
        assert!(summary.is_empty());
    }
    assert_eq!(reconciler.store().snapshot(), after_first);
}

#[tokio::test]
async fn traffic_scenarios_keep_unlimited_quota() {
    let reconciler = Reconciler::new(panel());
    let op = Operation::Bulk(BulkScenario::new().traffic(TrafficAxis::All, 50.0));
    run(&reconciler, &Scope::AllInbounds, &op).await.unwrap();

    let store = reconciler.store();
    assert_eq!(client_of(store, 2, "unlimited").total_quota_bytes, 0);
    assert_eq!(client_of(store, 1, "active").total_quota_bytes, 0);
    let depleted = client_of(store, 2, "depleted");
    assert_eq!(depleted.total_quota_bytes, 51 * GB);
    assert!(depleted.enabled);
    assert_mirrored(store);
}

#[tokio::test]
async fn no_pass_disables_an_enabled_client() {
    let reconciler = Reconciler::new(
        MemoryPanelStore::default()
            .with_inbound(1, "trojan", &doc(&[client("over", NOW - 5, GB, true)]))
            .with_traffic(ClientTraffic::new("over", 2 * GB, 0).mirror(NOW - 5, GB, true)),
    );
    let op = Operation::Bulk(BulkScenario::new().time(TimeAxis::ActiveOnly, 3));
    run(&reconciler, &Scope::AllInbounds, &op).await.unwrap();
    assert!(client_of(reconciler.store(), 1, "over").enabled);
}

#[tokio::test]
async fn manual_set_zero_days_means_unlimited() {
    let reconciler = Reconciler::new(panel());
    let op = Operation::Manual(ManualAction::ManualSet { days: Some(0), gb: None });
    let summary = run(&reconciler, &Scope::client("expired", Some(1)), &op)
        .await
        .unwrap();

    assert_eq!(summary.enabled, 1);
    let expired = client_of(reconciler.store(), 1, "expired");
    assert_eq!(expired.expiry_time, 0);
    assert_eq!(expired.total_quota_bytes, 0);
    assert!(expired.enabled);
    assert_mirrored(reconciler.store());
}

#[tokio::test]
async fn reset_usage_reenables_depleted_client() {
    let reconciler = Reconciler::new(
        MemoryPanelStore::default()
            .with_inbound(1, "vless", &doc(&[client("heavy", 0, 1_000_000_000, false)]))
            .with_traffic(
                ClientTraffic::new("heavy", 4_000_000_000, 1_000_000_000)
                    .mirror(0, 1_000_000_000, false),
            ),
    );
    let op = Operation::Manual(ManualAction::ResetUsage);
    let summary = run(&reconciler, &Scope::client("heavy", None), &op)
        .await
        .unwrap();

    assert_eq!(summary.resets, 1);
    assert_eq!(summary.enabled, 1);
    let traffic = reconciler.store().traffic("heavy").unwrap();
    assert_eq!((traffic.up, traffic.down), (0, 0));
    assert!(traffic.enable);
    assert!(client_of(reconciler.store(), 1, "heavy").enabled);
}

#[tokio::test]
async fn failed_commit_leaves_store_untouched() {
    let reconciler = Reconciler::new(panel());
    reconciler.store().set_fail_commit_after(Some(2));
    let before = reconciler.store().snapshot();

    let op = Operation::Bulk(
        BulkScenario::new()
            .time(TimeAxis::All, 7)
            .traffic(TrafficAxis::All, 1.0),
    );
    let err = run(&reconciler, &Scope::AllInbounds, &op).await.unwrap_err();

    assert!(matches!(err, EngineError::Store(StoreError::CommitFailed(_))));
    assert_eq!(reconciler.store().snapshot(), before);
    assert_eq!(reconciler.store().backups(), vec![before]);
}

#[tokio::test]
async fn backup_failure_prevents_writes() {
    let reconciler = Reconciler::new(panel());
    reconciler.store().set_fail_backup(true);
    let before = reconciler.store().snapshot();

    let op = Operation::Bulk(BulkScenario::new().time(TimeAxis::All, 1));
    let err = run(&reconciler, &Scope::AllInbounds, &op).await.unwrap_err();

    assert!(matches!(err, EngineError::Store(StoreError::BackupFailed(_))));
    assert_eq!(reconciler.store().snapshot(), before);
}

#[tokio::test]
async fn ambiguous_client_is_rejected() {
    let reconciler = Reconciler::new(
        panel().with_inbound(3, "trojan", &doc(&[client("active", 0, 0, true)])),
    );
    let op = Operation::Manual(ManualAction::ExtendDays(1));
    let err = run(&reconciler, &Scope::client("active", None), &op)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::AmbiguousClient { ref inbounds, .. } if inbounds == &vec![1, 3]
    ));
}

#[tokio::test]
async fn unknown_fields_survive_rewrite() {
    let reconciler = Reconciler::new(panel());
    let op = Operation::Manual(ManualAction::ExtendDays(2));
    run(&reconciler, &Scope::client("active", Some(1)), &op)
        .await
        .unwrap();

    let settings = reconciler.store().settings(1).unwrap();
    assert!(settings.contains(r#""decryption":"none""#));
    assert!(settings.contains(r#""fallbacks":[]"#));
    assert!(settings.contains(r#""id":"active-uuid""#));
    assert!(settings.contains(r#""flow":"""#));
    assert_eq!(
        client_of(reconciler.store(), 1, "active").expiry_time,
        NOW + 100_000 + 2 * MILLIS_PER_DAY
    );
}

#[tokio::test]
async fn rewritten_document_renames_legacy_quota_of_neighbours() {
    let legacy = r#"{"email":"b","id":"b-uuid","expiryTime":0,"total":7,"enable":true}"#;
    let store = MemoryPanelStore::default()
        .with_inbound(
            1,
            "vless",
            &doc(&[client("a", NOW + 5, 0, true), legacy.to_string()]),
        )
        .with_traffic(ClientTraffic::new("a", 0, 0).mirror(NOW + 5, 0, true))
        .with_traffic(ClientTraffic::new("b", 0, 0).mirror(0, 7, true));
    let reconciler = Reconciler::new(store);

    let op = Operation::Manual(ManualAction::ExtendDays(1));
    let summary = run(&reconciler, &Scope::client("a", Some(1)), &op)
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);

    let settings = reconciler.store().settings(1).unwrap();
    assert!(!settings.contains(r#""total":"#));
    assert!(settings.contains(r#""totalGB":7"#));
    let b = client_of(reconciler.store(), 1, "b");
    assert_eq!((b.expiry_time, b.total_quota_bytes, b.enabled), (0, 7, true));
    assert_eq!(b.extra.get("id").and_then(|v| v.as_str()), Some("b-uuid"));
    assert_mirrored(reconciler.store());
}

const SCHEMA: &str = r#"
CREATE TABLE inbounds (id INTEGER PRIMARY KEY, remark TEXT, port INTEGER, protocol TEXT, settings TEXT);
CREATE TABLE client_traffics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    inbound_id INTEGER,
    enable INTEGER,
    email TEXT UNIQUE,
    up INTEGER,
    down INTEGER,
    expiry_time INTEGER,
    total INTEGER
)
"#;

async fn sqlite_panel(dir: &Path) -> PathBuf {
    let path = dir.join("x-ui.db");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().filename(&path).create_if_missing(true))
        .await
        .expect("Failed to create database");
    for stmt in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(stmt).execute(&pool).await.expect("Failed to apply schema");
    }
    sqlx::query("INSERT INTO inbounds (id, remark, port, protocol, settings) VALUES (1, 'main', 443, 'vless', ?)")
        .bind(doc(&[
            client("expired", NOW - 1000, GB, false),
            client("active", NOW + 100_000, 0, true),
        ]))
        .execute(&pool)
        .await
        .expect("Failed to insert inbound");
    sqlx::query(
        "INSERT INTO client_traffics (inbound_id, enable, email, up, down, expiry_time, total) VALUES \
         (1, 0, 'expired', 100, 100, ?, ?), (1, 1, 'active', 1, 1, ?, 0)",
    )
    .bind(NOW - 1000)
    .bind(GB)
    .bind(NOW + 100_000)
    .execute(&pool)
    .await
    .expect("Failed to insert usage");
    pool.close().await;
    path
}

#[tokio::test]
async fn sqlite_pass_keeps_both_tables_in_sync() {
    let dir = tempfile::tempdir().unwrap();
    let path = sqlite_panel(dir.path()).await;
    let store = SqlitePanelStore::connect(
        SqliteStoreConfig::new(path.to_string_lossy()).backup_dir(dir.path().join("backups")),
    )
    .await
    .unwrap();

    let reconciler = Reconciler::new(store);
    let op = Operation::Bulk(BulkScenario::new().time(TimeAxis::ExpiredOnly, 30));
    let summary = run_on(&reconciler, &op).await;
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.enabled, 1);
    assert!(summary.backup.as_deref().is_some_and(Path::exists));

    let rows = reconciler.store().load_inbounds().await.unwrap();
    let settings = InboundSettings::decode(&rows[0].settings).unwrap();
    for c in &settings.clients {
        let (expiry, total, enable): (i64, i64, bool) = sqlx::query_as(
            "SELECT expiry_time, total, enable FROM client_traffics WHERE email = ?",
        )
        .bind(c.email())
        .fetch_one(reconciler.store().pool())
        .await
        .unwrap();
        assert_eq!((expiry, total, enable), (c.expiry_time, c.total_quota_bytes, c.enabled));
    }
    assert_eq!(settings.clients[0].expiry_time, NOW + 30 * MILLIS_PER_DAY);

    // a later zero-delta pass finds nothing to do
    let op = Operation::Bulk(BulkScenario::new().time(TimeAxis::All, 0));
    let summary = run_at(&reconciler, &op, NOW + 1).await;
    assert!(summary.is_empty());
}

async fn run_on<S: PanelStore>(reconciler: &Reconciler<S>, op: &Operation) -> xui_engine::ApplySummary {
    run_at(reconciler, op, NOW).await
}

async fn run_at<S: PanelStore>(
    reconciler: &Reconciler<S>,
    op: &Operation,
    now: i64,
) -> xui_engine::ApplySummary {
    let snapshot = reconciler.load().await.unwrap();
    let plan = snapshot.evaluate(&Scope::AllInbounds, op, now).unwrap();
    reconciler.apply(&plan).await.unwrap()
}
