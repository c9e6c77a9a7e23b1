//! Identity → consumed-bytes lookup built from the usage table.

use std::collections::HashMap;

use tracing::warn;

/// Raw usage row (`client_traffics.email/up/down`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRow {
    pub email: String,
    pub up: i64,
    pub down: i64,
}

impl UsageRow {
    pub fn new(email: impl Into<String>, up: i64, down: i64) -> Self {
        Self {
            email: email.into(),
            up,
            down,
        }
    }
}

/// Consumed bytes per client email.
///
/// Missing emails read as zero usage. Rows with an empty email are ignored.
/// Duplicate emails should not occur in a healthy database; when they do the
/// last row wins and the collision is counted.
#[derive(Debug, Clone, Default)]
pub struct UsageIndex {
    consumed: HashMap<String, i64>,
    duplicates: usize,
}

impl UsageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from raw rows.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = UsageRow>,
    {
        let mut index = Self::new();
        for row in rows {
            index.insert(row);
        }
        if index.duplicates > 0 {
            warn!(
                duplicates = index.duplicates,
                "usage table holds duplicate emails, last row wins"
            );
        }
        index
    }

    fn insert(&mut self, row: UsageRow) {
        if row.email.is_empty() {
            return;
        }
        let consumed = row.up.saturating_add(row.down);
        if self.consumed.insert(row.email, consumed).is_some() {
            self.duplicates += 1;
        }
    }

    /// Consumed bytes for `email` (zero when unknown).
    #[inline]
    pub fn consumed(&self, email: &str) -> i64 {
        self.consumed.get(email).copied().unwrap_or(0)
    }

    #[inline]
    pub fn contains(&self, email: &str) -> bool {
        self.consumed.contains_key(email)
    }

    /// Number of rows that overwrote an earlier row with the same email.
    #[inline]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}

impl FromIterator<UsageRow> for UsageIndex {
    fn from_iter<I: IntoIterator<Item = UsageRow>>(iter: I) -> Self {
        Self::from_rows(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_uplink_and_downlink() {
        let index = UsageIndex::from_rows([UsageRow::new("a", 10, 5), UsageRow::new("b", 0, 7)]);
        assert_eq!(index.consumed("a"), 15);
        assert_eq!(index.consumed("b"), 7);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn missing_email_is_zero() {
        let index = UsageIndex::new();
        assert_eq!(index.consumed("nobody"), 0);
        assert!(!index.contains("nobody"));
    }

    #[test]
    fn last_duplicate_wins_and_is_counted() {
        let index: UsageIndex = [UsageRow::new("a", 1, 1), UsageRow::new("a", 3, 3)]
            .into_iter()
            .collect();
        assert_eq!(index.consumed("a"), 6);
        assert_eq!(index.duplicates(), 1);
    }

    #[test]
    fn ignores_empty_email_and_saturates() {
        let index = UsageIndex::from_rows([UsageRow::new("", 5, 5), UsageRow::new("x", i64::MAX, 1)]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.consumed("x"), i64::MAX);
    }
}
