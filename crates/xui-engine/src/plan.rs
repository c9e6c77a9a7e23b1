//! Planning a reconciliation pass without side effects.

use std::collections::HashSet;

use tracing::debug;
use xui_store::{PendingWrites, RecordStore, RowUpdate, UsageIndex};

use crate::eligibility::{Eligibility, ProposedState, recalculate};
use crate::error::EngineError;
use crate::mutation::Mutation;
use crate::scenario::{Operation, RecordState, propose};
use crate::selector::{Scope, select};

/// Before/after view of one touched record, for previews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChange {
    pub inbound_id: i64,
    pub email: String,
    pub mutation: Mutation,
    pub expiry_before: i64,
    pub expiry_after: i64,
    pub quota_before: i64,
    pub quota_after: i64,
    pub enabled_before: bool,
    pub enabled_after: bool,
    /// Consumed bytes as loaded (before any reset).
    pub consumed_bytes: i64,
}

impl RecordChange {
    #[inline]
    pub fn newly_enabled(&self) -> bool {
        !self.enabled_before && self.enabled_after
    }

    #[inline]
    pub fn resets_usage(&self) -> bool {
        self.mutation.resets_usage()
    }
}

/// Result of [`evaluate`]: counts, preview rows and the writes to commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannedChange {
    /// Records with at least one write.
    pub processed_count: usize,
    /// Records flipped from disabled to enabled.
    pub enabled_count: usize,
    /// Records whose usage counters are reset.
    pub reset_count: usize,
    /// Malformed inbounds inside the scope that were skipped.
    pub skipped_inbounds: Vec<i64>,
    pub changes: Vec<RecordChange>,
    pub pending: PendingWrites,
}

impl PlannedChange {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Compute every write `op` implies for `scope` at `now` (ms since epoch).
///
/// `records` is not modified; edits are made on a private copy whose dirty
/// documents end up in [`PlannedChange::pending`].
pub fn evaluate(
    records: &RecordStore,
    usage: &UsageIndex,
    scope: &Scope,
    op: &Operation,
    now: i64,
) -> Result<PlannedChange, EngineError> {
    op.validate()?;
    if matches!(op, Operation::Manual(_)) && !scope.is_single_client() {
        return Err(EngineError::ManualRequiresClient);
    }
    let selection = select(records, scope)?;

    let mut working = records.clone();
    let mut plan = PlannedChange {
        skipped_inbounds: selection.skipped.clone(),
        ..PlannedChange::default()
    };
    let mut written: HashSet<String> = HashSet::new();

    for &inbound_id in &selection.inbound_ids {
        let count = working
            .find_inbound(inbound_id)
            .map_or(0, |inbound| inbound.clients().len());

        for index in 0..count {
            let Some(client) = working.client_mut(inbound_id, index) else {
                continue;
            };
            let email = client.email().to_string();
            if !selection.admits(&email) {
                continue;
            }

            let consumed = usage.consumed(&email);
            let before = RecordState {
                expiry_time: client.expiry_time,
                total_quota_bytes: client.total_quota_bytes,
                consumed_bytes: consumed,
                enabled: client.enabled,
            };
            let mutation = propose(op, &before, now);

            let mut document_changed = false;
            if let Some(ts) = mutation.expiry_time() {
                client.expiry_time = ts;
                document_changed = true;
            }
            if let Some(bytes) = mutation.total_quota_bytes() {
                client.total_quota_bytes = bytes;
                document_changed = true;
            }
            let reset = mutation.resets_usage();

            let after = ProposedState {
                expiry_time: client.expiry_time,
                total_quota_bytes: client.total_quota_bytes,
                consumed_bytes: if reset { 0 } else { consumed },
                enabled: client.enabled,
            };
            if recalculate(&after, now) == Eligibility::Reenable {
                client.enabled = true;
                document_changed = true;
                plan.enabled_count += 1;
            }

            if !document_changed && !reset {
                continue;
            }

            if !written.insert(email.clone()) {
                return Err(EngineError::DuplicateIdentity(email));
            }

            plan.pending.rows.push(RowUpdate {
                email: email.clone(),
                expiry_time: client.expiry_time,
                total: client.total_quota_bytes,
                enable: client.enabled,
            });
            if reset {
                plan.pending.usage_resets.push(email.clone());
                plan.reset_count += 1;
            }
            plan.processed_count += 1;
            plan.changes.push(RecordChange {
                inbound_id,
                email,
                mutation,
                expiry_before: before.expiry_time,
                expiry_after: client.expiry_time,
                quota_before: before.total_quota_bytes,
                quota_after: client.total_quota_bytes,
                enabled_before: before.enabled,
                enabled_after: client.enabled,
                consumed_bytes: consumed,
            });

            if document_changed {
                working.mark_dirty(inbound_id);
            }
        }
    }

    plan.pending.documents = working.dirty_documents()?;

    debug!(
        processed = plan.processed_count,
        enabled = plan.enabled_count,
        resets = plan.reset_count,
        documents = plan.pending.documents.len(),
        "pass evaluated"
    );
    Ok(plan)
}
