//! # xui-bulk
//!
//! Bulk maintenance of subscriber expiry, traffic quota and enabled status
//! in x-ui panel databases.
//!
//! ## Crates
//!
//! - [`xui_store`] - Record model and storage adapters
//! - [`xui_engine`] - Selection, scenarios, eligibility and reconciliation
//! - [`xui_config`] - Configuration loading and database discovery
//! - [`xui_manager`] - CLI and interactive shell

pub use xui_config as config;
pub use xui_engine as engine;
pub use xui_manager as manager;
pub use xui_store as store;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use xui_config::{Config, load_config, validate_config};
    pub use xui_engine::{
        ApplySummary, BulkScenario, ManualAction, Operation, PlannedChange, Reconciler, Scope,
        Snapshot, TimeAxis, TrafficAxis, evaluate,
    };
    pub use xui_store::{MemoryPanelStore, PanelStore, RecordStore, UsageIndex};
}
