//! Proposed per-record field mutations.

/// Field changes proposed for one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldChanges {
    pub expiry_time: Option<i64>,
    pub total_quota_bytes: Option<i64>,
    pub reset_usage: bool,
}

impl FieldChanges {
    /// Drop proposals that equal the current values.
    #[must_use]
    pub fn against(self, expiry_time: i64, total_quota_bytes: i64) -> Self {
        Self {
            expiry_time: self.expiry_time.filter(|&v| v != expiry_time),
            total_quota_bytes: self.total_quota_bytes.filter(|&v| v != total_quota_bytes),
            reset_usage: self.reset_usage,
        }
    }
}

/// What the scenario engine wants done to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    NoChange,
    SetExpiry(i64),
    SetQuota(i64),
    ResetUsage,
    /// More than one of the above.
    Combination(FieldChanges),
}

impl Mutation {
    /// Normalize a set of changes into the narrowest variant.
    pub fn from_changes(changes: FieldChanges) -> Self {
        match (changes.expiry_time, changes.total_quota_bytes, changes.reset_usage) {
            (None, None, false) => Self::NoChange,
            (Some(ts), None, false) => Self::SetExpiry(ts),
            (None, Some(bytes), false) => Self::SetQuota(bytes),
            (None, None, true) => Self::ResetUsage,
            _ => Self::Combination(changes),
        }
    }

    pub fn changes(&self) -> FieldChanges {
        match *self {
            Self::NoChange => FieldChanges::default(),
            Self::SetExpiry(ts) => FieldChanges {
                expiry_time: Some(ts),
                ..FieldChanges::default()
            },
            Self::SetQuota(bytes) => FieldChanges {
                total_quota_bytes: Some(bytes),
                ..FieldChanges::default()
            },
            Self::ResetUsage => FieldChanges {
                reset_usage: true,
                ..FieldChanges::default()
            },
            Self::Combination(changes) => changes,
        }
    }

    #[inline]
    pub fn expiry_time(&self) -> Option<i64> {
        self.changes().expiry_time
    }

    #[inline]
    pub fn total_quota_bytes(&self) -> Option<i64> {
        self.changes().total_quota_bytes
    }

    #[inline]
    pub fn resets_usage(&self) -> bool {
        self.changes().reset_usage
    }

    #[inline]
    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }
}
