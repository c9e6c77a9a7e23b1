//! Pending writes handed to [`PanelStore::commit`](crate::PanelStore::commit).

/// Replacement settings document for one inbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub inbound_id: i64,
    pub settings: String,
}

/// Mirror of a client's document fields in the usage table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    pub email: String,
    pub expiry_time: i64,
    pub total: i64,
    pub enable: bool,
}

/// Everything one reconciliation pass wants to write.
///
/// A store must apply all of it in a single transaction or none of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingWrites {
    pub documents: Vec<DocumentUpdate>,
    pub rows: Vec<RowUpdate>,
    /// Emails whose `up`/`down` counters are zeroed.
    pub usage_resets: Vec<String>,
}

impl PendingWrites {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.rows.is_empty() && self.usage_resets.is_empty()
    }

    /// Number of individual statements the commit will run.
    #[inline]
    pub fn statement_count(&self) -> usize {
        self.documents.len() + self.rows.len() + self.usage_resets.len()
    }
}

/// What a successful commit wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    pub documents_written: usize,
    pub rows_updated: usize,
    /// Row updates that matched no usage-table row.
    pub rows_missing: usize,
    pub usage_resets: usize,
}
