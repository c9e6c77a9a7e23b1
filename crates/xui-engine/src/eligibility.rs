//! Re-deriving the enabled flag after a mutation.
//!
//! A record is eligible when `timeOk && trafficOk`. Only the
//! disabled → enabled direction is ever applied here; disabling is left to
//! the panel's live enforcement.

/// `expiry <= 0 || expiry > now`.
#[inline]
pub fn time_ok(expiry_time: i64, now: i64) -> bool {
    expiry_time <= 0 || expiry_time > now
}

/// `quota <= 0 || consumed < quota`.
#[inline]
pub fn traffic_ok(total_quota_bytes: i64, consumed_bytes: i64) -> bool {
    total_quota_bytes <= 0 || consumed_bytes < total_quota_bytes
}

#[inline]
pub fn is_eligible(expiry_time: i64, total_quota_bytes: i64, consumed_bytes: i64, now: i64) -> bool {
    time_ok(expiry_time, now) && traffic_ok(total_quota_bytes, consumed_bytes)
}

/// Post-mutation view of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposedState {
    pub expiry_time: i64,
    pub total_quota_bytes: i64,
    /// Consumed bytes after any usage reset (a reset counts as zero).
    pub consumed_bytes: i64,
    pub enabled: bool,
}

/// Outcome of the eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Unchanged,
    /// Disabled record that now satisfies the predicate.
    Reenable,
}

/// Decide whether a record must be flipped back to enabled.
pub fn recalculate(state: &ProposedState, now: i64) -> Eligibility {
    if !state.enabled
        && is_eligible(
            state.expiry_time,
            state.total_quota_bytes,
            state.consumed_bytes,
            now,
        )
    {
        Eligibility::Reenable
    } else {
        Eligibility::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_000_000;

    fn proposed(expiry_time: i64, total_quota_bytes: i64, consumed_bytes: i64, enabled: bool) -> ProposedState {
        ProposedState {
            expiry_time,
            total_quota_bytes,
            consumed_bytes,
            enabled,
        }
    }

    #[test]
    fn predicate_edges() {
        assert!(time_ok(0, NOW));
        assert!(time_ok(-1, NOW));
        assert!(!time_ok(NOW, NOW));
        assert!(time_ok(NOW + 1, NOW));
        assert!(traffic_ok(0, 10));
        assert!(!traffic_ok(10, 10));
        assert!(traffic_ok(10, 9));
    }

    #[test]
    fn reenables_disabled_record_that_is_now_valid() {
        assert_eq!(
            recalculate(&proposed(NOW + 5, 100, 0, false), NOW),
            Eligibility::Reenable
        );
    }

    #[test]
    fn never_disables() {
        assert_eq!(
            recalculate(&proposed(NOW - 5, 100, 500, true), NOW),
            Eligibility::Unchanged
        );
    }

    #[test]
    fn stays_disabled_while_invalid() {
        assert_eq!(
            recalculate(&proposed(NOW + 5, 100, 100, false), NOW),
            Eligibility::Unchanged
        );
        assert_eq!(
            recalculate(&proposed(NOW - 5, 0, 0, false), NOW),
            Eligibility::Unchanged
        );
    }

    #[test]
    fn reset_usage_restores_depleted_record() {
        // consumed 5e9 against 1e9 quota, reset counts as zero
        let after_reset = proposed(0, 1_000_000_000, 0, false);
        assert_eq!(recalculate(&after_reset, NOW), Eligibility::Reenable);
    }
}
