//! Backup-then-commit of a planned pass against a [`PanelStore`].

use std::path::PathBuf;

use tracing::{debug, info, warn};
use xui_store::{PanelStore, RecordStore, UsageIndex};

use crate::error::EngineError;
use crate::plan::{PlannedChange, evaluate};
use crate::scenario::Operation;
use crate::selector::Scope;

/// Records and usage loaded from a store at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: RecordStore,
    pub usage: UsageIndex,
}

impl Snapshot {
    pub fn new(records: RecordStore, usage: UsageIndex) -> Self {
        Self { records, usage }
    }

    /// Plan `op` over `scope`. Pure: the snapshot is not modified.
    pub fn evaluate(&self, scope: &Scope, op: &Operation, now: i64) -> Result<PlannedChange, EngineError> {
        evaluate(&self.records, &self.usage, scope, op, now)
    }
}

/// Outcome of [`Reconciler::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub processed: usize,
    pub enabled: usize,
    pub resets: usize,
    pub documents_written: usize,
    /// Row updates that found no usage-table row.
    pub rows_missing: usize,
    /// Where the pre-commit backup was written; `None` when nothing was
    /// committed.
    pub backup: Option<PathBuf>,
}

impl ApplySummary {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processed == 0 && self.backup.is_none()
    }
}

/// Loads snapshots from a store and commits planned passes back to it.
#[derive(Debug, Clone)]
pub struct Reconciler<S> {
    store: S,
}

impl<S: PanelStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Read both tables and build a [`Snapshot`].
    pub async fn load(&self) -> Result<Snapshot, EngineError> {
        let rows = self.store.load_inbounds().await?;
        let usage = UsageIndex::from_rows(self.store.load_usage().await?);
        let records = RecordStore::from_rows(rows);

        let malformed = records.malformed().len();
        if malformed > 0 {
            warn!(malformed, "inbounds with malformed settings will be skipped");
        }
        info!(
            inbounds = records.inbounds().len(),
            usage_rows = usage.len(),
            "panel data loaded"
        );
        Ok(Snapshot::new(records, usage))
    }

    /// Back up the store, then commit `plan` in one transaction.
    ///
    /// Nothing is written when the backup fails. An empty plan touches
    /// neither the backup nor the store.
    pub async fn apply(&self, plan: &PlannedChange) -> Result<ApplySummary, EngineError> {
        if plan.is_empty() {
            debug!("nothing to commit");
            return Ok(ApplySummary::default());
        }

        let backup = self.store.backup().await.inspect_err(|e| {
            warn!(error = %e, "backup failed, aborting before any write");
        })?;
        info!(path = %backup.display(), "backup written");

        let receipt = self.store.commit(&plan.pending).await.inspect_err(|e| {
            warn!(error = %e, "commit failed, transaction rolled back");
        })?;
        if receipt.rows_missing > 0 {
            warn!(
                rows_missing = receipt.rows_missing,
                "some clients have no usage row"
            );
        }
        info!(
            processed = plan.processed_count,
            enabled = plan.enabled_count,
            resets = receipt.usage_resets,
            documents = receipt.documents_written,
            "changes committed"
        );

        Ok(ApplySummary {
            processed: plan.processed_count,
            enabled: plan.enabled_count,
            resets: plan.reset_count,
            documents_written: receipt.documents_written,
            rows_missing: receipt.rows_missing,
            backup: Some(backup),
        })
    }
}
