//! Data model and storage adapters for x-ui panel databases.
//!
//! An x-ui database keeps each subscriber twice: as an entry in the JSON
//! `settings` document of its inbound, and as a row of the normalized
//! `client_traffics` table. This crate decodes the former, indexes the
//! usage counters of the latter, and provides the [`PanelStore`] port
//! through which both are read and written back in one transaction.
//!
//! # Example
//!
//! ```
//! use xui_store::{MemoryPanelStore, PanelStore, RecordStore, UsageIndex};
//! use xui_store::memory::ClientTraffic;
//!
//! # async fn example() -> Result<(), xui_store::StoreError> {
//! let store = MemoryPanelStore::default()
//!     .with_inbound(1, "vless", r#"{"clients":[{"email":"a@example.com"}]}"#)
//!     .with_traffic(ClientTraffic::new("a@example.com", 10, 20));
//!
//! let records = RecordStore::from_rows(store.load_inbounds().await?);
//! let usage = UsageIndex::from_rows(store.load_usage().await?);
//! assert_eq!(records.inbounds().len(), 1);
//! assert_eq!(usage.consumed("a@example.com"), 30);
//! # Ok(())
//! # }
//! ```

pub mod backup;
mod error;
pub mod memory;
mod record;
pub mod sql;
mod store;
mod traits;
mod usage;
mod writes;

pub use backup::BackupMethod;
pub use error::StoreError;
pub use memory::MemoryPanelStore;
pub use record::{
    BYTES_PER_GB, ClientRecord, Inbound, InboundRow, InboundSettings, MILLIS_PER_DAY, gb_to_bytes,
};
pub use store::{MalformedInbound, RecordStore};
pub use traits::PanelStore;
pub use usage::{UsageIndex, UsageRow};
pub use writes::{CommitReceipt, DocumentUpdate, PendingWrites, RowUpdate};
