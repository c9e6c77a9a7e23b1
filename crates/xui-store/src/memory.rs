//! In-process panel store.
//!
//! Holds the same two tables as a panel database and supports failure
//! injection, so the reconciliation path can be exercised without SQLite.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::record::InboundRow;
use crate::traits::PanelStore;
use crate::usage::UsageRow;
use crate::writes::{CommitReceipt, PendingWrites};

/// One `client_traffics` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientTraffic {
    pub email: String,
    pub up: i64,
    pub down: i64,
    pub expiry_time: i64,
    pub total: i64,
    pub enable: bool,
}

impl ClientTraffic {
    pub fn new(email: impl Into<String>, up: i64, down: i64) -> Self {
        Self {
            email: email.into(),
            up,
            down,
            expiry_time: 0,
            total: 0,
            enable: true,
        }
    }

    /// Builder: set the mirrored expiry, quota and enabled flag.
    pub fn mirror(mut self, expiry_time: i64, total: i64, enable: bool) -> Self {
        self.expiry_time = expiry_time;
        self.total = total;
        self.enable = enable;
        self
    }
}

/// Full contents of a [`MemoryPanelStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTables {
    pub inbounds: Vec<InboundRow>,
    pub traffics: Vec<ClientTraffic>,
}

/// Panel store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryPanelStore {
    tables: Mutex<MemoryTables>,
    backups: Mutex<Vec<MemoryTables>>,
    fail_backup: AtomicBool,
    fail_commit_after: Mutex<Option<usize>>,
}

impl MemoryPanelStore {
    pub fn new(tables: MemoryTables) -> Self {
        Self {
            tables: Mutex::new(tables),
            ..Self::default()
        }
    }

    /// Builder: add an inbound row.
    pub fn with_inbound(self, id: i64, protocol: &str, settings: &str) -> Self {
        self.tables.lock().inbounds.push(InboundRow {
            id,
            remark: format!("inbound-{id}"),
            port: 10_000 + id,
            protocol: protocol.to_string(),
            settings: settings.to_string(),
        });
        self
    }

    /// Builder: add a usage row.
    pub fn with_traffic(self, traffic: ClientTraffic) -> Self {
        self.tables.lock().traffics.push(traffic);
        self
    }

    /// Copy of the current tables.
    pub fn snapshot(&self) -> MemoryTables {
        self.tables.lock().clone()
    }

    /// Snapshots taken by [`PanelStore::backup`], oldest first.
    pub fn backups(&self) -> Vec<MemoryTables> {
        self.backups.lock().clone()
    }

    pub fn traffic(&self, email: &str) -> Option<ClientTraffic> {
        self.tables
            .lock()
            .traffics
            .iter()
            .find(|t| t.email == email)
            .cloned()
    }

    pub fn settings(&self, inbound_id: i64) -> Option<String> {
        self.tables
            .lock()
            .inbounds
            .iter()
            .find(|i| i.id == inbound_id)
            .map(|i| i.settings.clone())
    }

    /// Make every following backup fail.
    pub fn set_fail_backup(&self, fail: bool) {
        self.fail_backup.store(fail, Ordering::SeqCst);
    }

    /// Make the next commits fail once `n` statements have run.
    pub fn set_fail_commit_after(&self, n: Option<usize>) {
        *self.fail_commit_after.lock() = n;
    }

    fn apply(staged: &mut MemoryTables, writes: &PendingWrites, fail_after: Option<usize>) -> Result<CommitReceipt, StoreError> {
        let mut receipt = CommitReceipt::default();
        let mut executed = 0usize;
        let mut step = || -> Result<(), StoreError> {
            if fail_after.is_some_and(|n| executed >= n) {
                return Err(StoreError::CommitFailed(format!(
                    "injected failure after {executed} statements"
                )));
            }
            executed += 1;
            Ok(())
        };

        for doc in &writes.documents {
            step()?;
            let row = staged
                .inbounds
                .iter_mut()
                .find(|i| i.id == doc.inbound_id)
                .ok_or_else(|| StoreError::CommitFailed(format!("inbound {} not found", doc.inbound_id)))?;
            row.settings.clone_from(&doc.settings);
            receipt.documents_written += 1;
        }

        for update in &writes.rows {
            step()?;
            let mut matched = false;
            for t in staged.traffics.iter_mut().filter(|t| t.email == update.email) {
                t.expiry_time = update.expiry_time;
                t.total = update.total;
                t.enable = update.enable;
                matched = true;
            }
            if matched {
                receipt.rows_updated += 1;
            } else {
                receipt.rows_missing += 1;
            }
        }

        for email in &writes.usage_resets {
            step()?;
            for t in staged.traffics.iter_mut().filter(|t| &t.email == email) {
                t.up = 0;
                t.down = 0;
            }
            receipt.usage_resets += 1;
        }

        Ok(receipt)
    }
}

#[async_trait]
impl PanelStore for MemoryPanelStore {
    async fn load_inbounds(&self) -> Result<Vec<InboundRow>, StoreError> {
        Ok(self.tables.lock().inbounds.clone())
    }

    async fn load_usage(&self) -> Result<Vec<UsageRow>, StoreError> {
        Ok(self
            .tables
            .lock()
            .traffics
            .iter()
            .map(|t| UsageRow::new(t.email.clone(), t.up, t.down))
            .collect())
    }

    async fn backup(&self) -> Result<PathBuf, StoreError> {
        if self.fail_backup.load(Ordering::SeqCst) {
            return Err(StoreError::BackupFailed("injected backup failure".into()));
        }
        let snapshot = self.snapshot();
        let mut backups = self.backups.lock();
        backups.push(snapshot);
        Ok(PathBuf::from(format!("memory://backup/{}", backups.len())))
    }

    async fn commit(&self, writes: &PendingWrites) -> Result<CommitReceipt, StoreError> {
        let fail_after = *self.fail_commit_after.lock();
        let mut tables = self.tables.lock();
        let mut staged = tables.clone();
        let receipt = Self::apply(&mut staged, writes, fail_after)?;
        *tables = staged;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writes::{DocumentUpdate, RowUpdate};

    fn store() -> MemoryPanelStore {
        MemoryPanelStore::default()
            .with_inbound(1, "vless", r#"{"clients":[{"email":"a"}]}"#)
            .with_traffic(ClientTraffic::new("a", 3, 4))
    }

    fn writes() -> PendingWrites {
        PendingWrites {
            documents: vec![DocumentUpdate {
                inbound_id: 1,
                settings: r#"{"clients":[{"email":"a","enable":true}]}"#.into(),
            }],
            rows: vec![RowUpdate {
                email: "a".into(),
                expiry_time: 5,
                total: 6,
                enable: true,
            }],
            usage_resets: vec!["a".into()],
        }
    }

    #[tokio::test]
    async fn commit_applies_everything() {
        let store = store();
        let receipt = store.commit(&writes()).await.unwrap();
        assert_eq!(receipt.documents_written, 1);
        assert_eq!(receipt.rows_updated, 1);
        assert_eq!(receipt.usage_resets, 1);
        let t = store.traffic("a").unwrap();
        assert_eq!((t.up, t.down, t.expiry_time, t.total, t.enable), (0, 0, 5, 6, true));
    }

    #[tokio::test]
    async fn failed_commit_leaves_tables_untouched() {
        let store = store();
        let before = store.snapshot();
        store.set_fail_commit_after(Some(2));
        assert!(matches!(
            store.commit(&writes()).await,
            Err(StoreError::CommitFailed(_))
        ));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn backup_records_snapshot_or_fails() {
        let store = store();
        let path = store.backup().await.unwrap();
        assert_eq!(path, PathBuf::from("memory://backup/1"));
        assert_eq!(store.backups().len(), 1);
        store.set_fail_backup(true);
        assert!(matches!(store.backup().await, Err(StoreError::BackupFailed(_))));
    }
}
