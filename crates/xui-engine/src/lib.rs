//! Reconciliation engine for x-ui client records.
//!
//! A pass is planned with [`evaluate`] (or [`Snapshot::evaluate`]) and
//! committed with [`Reconciler::apply`]:
//!
//! 1. the [`Scope`] picks the inbounds and, optionally, one client;
//! 2. the [`Operation`] proposes a [`Mutation`] for each selected record;
//! 3. eligibility is re-derived and disabled records that became valid are
//!    re-enabled;
//! 4. the resulting [`PendingWrites`](xui_store::PendingWrites) are committed
//!    after a backup, in a single transaction.
//!
//! ```
//! use xui_engine::{BulkScenario, Operation, Reconciler, Scope, TimeAxis};
//! use xui_store::MemoryPanelStore;
//!
//! # async fn example() -> Result<(), xui_engine::EngineError> {
//! let store = MemoryPanelStore::default()
//!     .with_inbound(1, "vless", r#"{"clients":[{"email":"a","expiryTime":1,"enable":false}]}"#);
//! let reconciler = Reconciler::new(store);
//!
//! let snapshot = reconciler.load().await?;
//! let op = Operation::Bulk(BulkScenario::new().time(TimeAxis::ExpiredOnly, 30));
//! let plan = snapshot.evaluate(&Scope::AllInbounds, &op, xui_engine::now_millis())?;
//! let summary = reconciler.apply(&plan).await?;
//! assert_eq!(summary.enabled, 1);
//! # Ok(())
//! # }
//! ```

mod eligibility;
mod error;
mod mutation;
mod plan;
mod reconcile;
mod scenario;
mod selector;

use std::time::{SystemTime, UNIX_EPOCH};

pub use eligibility::{Eligibility, ProposedState, is_eligible, recalculate, time_ok, traffic_ok};
pub use error::EngineError;
pub use mutation::{FieldChanges, Mutation};
pub use plan::{PlannedChange, RecordChange, evaluate};
pub use reconcile::{ApplySummary, Reconciler, Snapshot};
pub use scenario::{
    BulkScenario, ManualAction, Operation, RecordState, TimeAxis, TrafficAxis, propose,
};
pub use selector::{Scope, Selection, select};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
