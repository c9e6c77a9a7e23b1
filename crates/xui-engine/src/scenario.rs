//! Scenario engine: record state + operation + time → proposed mutation.
//!
//! Everything here is pure. Two mutually exclusive modes exist:
//!
//! - [`ManualAction`]: one explicit edit of one client.
//! - [`BulkScenario`]: two independent rules (time and traffic) evaluated
//!   against every selected record.
//!
//! A bulk axis with a zero delta proposes nothing, and proposed values equal
//! to the current ones are dropped. A zero-delta pass is therefore a no-op
//! whatever the clock reads.

use xui_store::{MILLIS_PER_DAY, gb_to_bytes};

use crate::error::EngineError;
use crate::mutation::{FieldChanges, Mutation};

/// Which records the time rule extends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeAxis {
    #[default]
    None,
    All,
    /// Records that are not expired (unlimited ones included).
    ActiveOnly,
    /// Records whose finite expiry is in the past.
    ExpiredOnly,
}

/// Which records the traffic rule tops up. Unlimited quotas are never touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrafficAxis {
    #[default]
    None,
    All,
    DepletedOnly,
    NotDepletedOnly,
}

/// Bulk rule applied across a selection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BulkScenario {
    pub time: TimeAxis,
    pub days_to_add: i64,
    pub traffic: TrafficAxis,
    pub gb_to_add: f64,
}

impl BulkScenario {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the time rule.
    #[must_use]
    pub fn time(mut self, axis: TimeAxis, days_to_add: i64) -> Self {
        self.time = axis;
        self.days_to_add = days_to_add;
        self
    }

    /// Builder: set the traffic rule.
    #[must_use]
    pub fn traffic(mut self, axis: TrafficAxis, gb_to_add: f64) -> Self {
        self.traffic = axis;
        self.gb_to_add = gb_to_add;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.days_to_add < 0 {
            return Err(EngineError::invalid("days to add must be >= 0"));
        }
        if !self.gb_to_add.is_finite() || self.gb_to_add < 0.0 {
            return Err(EngineError::invalid("GB to add must be a finite value >= 0"));
        }
        Ok(())
    }
}

/// Explicit edit of a single client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManualAction {
    /// Push expiry `n` days past the later of now and the current expiry.
    ExtendDays(i64),
    /// Expire `n` days from now, whatever the current expiry.
    Reactivate(i64),
    /// Raise the quota by `g` GB.
    AddQuota(f64),
    /// Zero the usage counters at commit.
    ResetUsage,
    /// Overwrite expiry and/or quota. `0` means unlimited, `None` leaves the
    /// field alone.
    ManualSet { days: Option<i64>, gb: Option<f64> },
}

impl ManualAction {
    pub fn validate(&self) -> Result<(), EngineError> {
        match *self {
            Self::ExtendDays(n) | Self::Reactivate(n) if n <= 0 => {
                Err(EngineError::invalid("number of days must be > 0"))
            }
            Self::AddQuota(g) if !g.is_finite() || g <= 0.0 => {
                Err(EngineError::invalid("GB to add must be > 0"))
            }
            Self::ManualSet { days: Some(d), .. } if d < 0 => {
                Err(EngineError::invalid("days must be >= 0"))
            }
            Self::ManualSet { gb: Some(g), .. } if !g.is_finite() || g < 0.0 => {
                Err(EngineError::invalid("GB must be >= 0"))
            }
            _ => Ok(()),
        }
    }
}

/// A manual action or a bulk scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    Manual(ManualAction),
    Bulk(BulkScenario),
}

impl Operation {
    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            Self::Manual(action) => action.validate(),
            Self::Bulk(scenario) => scenario.validate(),
        }
    }
}

/// The inputs the engine reads for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordState {
    pub expiry_time: i64,
    pub total_quota_bytes: i64,
    pub consumed_bytes: i64,
    pub enabled: bool,
}

impl RecordState {
    /// `0 < expiryTime < now`.
    #[inline]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expiry_time > 0 && self.expiry_time < now
    }

    /// Finite quota that usage has reached.
    #[inline]
    pub fn is_depleted(&self) -> bool {
        self.total_quota_bytes > 0 && self.consumed_bytes >= self.total_quota_bytes
    }
}

#[inline]
fn days_to_millis(days: i64) -> i64 {
    days.saturating_mul(MILLIS_PER_DAY)
}

/// Compute the mutation `op` proposes for a record in `state` at `now`
/// (milliseconds since the epoch).
pub fn propose(op: &Operation, state: &RecordState, now: i64) -> Mutation {
    let changes = match op {
        Operation::Manual(action) => manual_changes(*action, state, now),
        Operation::Bulk(scenario) => bulk_changes(scenario, state, now),
    };
    Mutation::from_changes(changes.against(state.expiry_time, state.total_quota_bytes))
}

fn manual_changes(action: ManualAction, state: &RecordState, now: i64) -> FieldChanges {
    let mut changes = FieldChanges::default();
    match action {
        ManualAction::ExtendDays(n) => {
            let base = if state.expiry_time > 0 {
                state.expiry_time.max(now)
            } else {
                now
            };
            changes.expiry_time = Some(base.saturating_add(days_to_millis(n)));
        }
        ManualAction::Reactivate(n) => {
            changes.expiry_time = Some(now.saturating_add(days_to_millis(n)));
        }
        ManualAction::AddQuota(gb) => {
            changes.total_quota_bytes =
                Some(state.total_quota_bytes.max(0).saturating_add(gb_to_bytes(gb)));
        }
        ManualAction::ResetUsage => changes.reset_usage = true,
        ManualAction::ManualSet { days, gb } => {
            changes.expiry_time = days.map(|d| {
                if d == 0 {
                    0
                } else {
                    now.saturating_add(days_to_millis(d))
                }
            });
            changes.total_quota_bytes = gb.map(gb_to_bytes);
        }
    }
    changes
}

fn bulk_changes(scenario: &BulkScenario, state: &RecordState, now: i64) -> FieldChanges {
    let mut changes = FieldChanges::default();

    let expired = state.is_expired(now);
    let time_applies = scenario.days_to_add != 0
        && match scenario.time {
            TimeAxis::None => false,
            TimeAxis::All => true,
            TimeAxis::ActiveOnly => !expired,
            TimeAxis::ExpiredOnly => expired,
        };
    if time_applies {
        let base = if expired && scenario.time != TimeAxis::ActiveOnly {
            now
        } else {
            state.expiry_time
        };
        let base = if base > 0 { base } else { now };
        changes.expiry_time = Some(base.saturating_add(days_to_millis(scenario.days_to_add)));
    }

    let depleted = state.is_depleted();
    let gb_bytes = gb_to_bytes(scenario.gb_to_add);
    let traffic_applies = gb_bytes != 0
        && match scenario.traffic {
            TrafficAxis::None => false,
            TrafficAxis::All => true,
            TrafficAxis::DepletedOnly => depleted,
            TrafficAxis::NotDepletedOnly => !depleted,
        };
    if traffic_applies && state.total_quota_bytes > 0 {
        changes.total_quota_bytes = Some(state.total_quota_bytes.saturating_add(gb_bytes));
    }

    changes
}
