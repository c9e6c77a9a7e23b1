//! Storage port consumed by the reconciliation engine.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::InboundRow;
use crate::usage::UsageRow;
use crate::writes::{CommitReceipt, PendingWrites};

/// Access to a panel database.
///
/// The engine assumes exclusive access for the duration of one invocation;
/// implementations do no conflict detection against concurrent writers.
#[async_trait]
pub trait PanelStore: Send + Sync {
    /// Read every inbound row in a stable order.
    async fn load_inbounds(&self) -> Result<Vec<InboundRow>, StoreError>;

    /// Read the per-client usage counters.
    async fn load_usage(&self) -> Result<Vec<UsageRow>, StoreError>;

    /// Take a full snapshot of the store and return where it was written.
    async fn backup(&self) -> Result<PathBuf, StoreError>;

    /// Apply all pending writes atomically.
    ///
    /// On error nothing is visible: the transaction has been rolled back.
    async fn commit(&self, writes: &PendingWrites) -> Result<CommitReceipt, StoreError>;
}

#[async_trait]
impl<S: PanelStore + ?Sized> PanelStore for Arc<S> {
    #[inline]
    async fn load_inbounds(&self) -> Result<Vec<InboundRow>, StoreError> {
        (**self).load_inbounds().await
    }

    #[inline]
    async fn load_usage(&self) -> Result<Vec<UsageRow>, StoreError> {
        (**self).load_usage().await
    }

    #[inline]
    async fn backup(&self) -> Result<PathBuf, StoreError> {
        (**self).backup().await
    }

    #[inline]
    async fn commit(&self, writes: &PendingWrites) -> Result<CommitReceipt, StoreError> {
        (**self).commit(writes).await
    }
}

#[async_trait]
impl<S: PanelStore + ?Sized> PanelStore for Box<S> {
    #[inline]
    async fn load_inbounds(&self) -> Result<Vec<InboundRow>, StoreError> {
        (**self).load_inbounds().await
    }

    #[inline]
    async fn load_usage(&self) -> Result<Vec<UsageRow>, StoreError> {
        (**self).load_usage().await
    }

    #[inline]
    async fn backup(&self) -> Result<PathBuf, StoreError> {
        (**self).backup().await
    }

    #[inline]
    async fn commit(&self, writes: &PendingWrites) -> Result<CommitReceipt, StoreError> {
        (**self).commit(writes).await
    }
}
