//! Storage error types.

/// Error raised by the record model or a storage adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be opened or read.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The pre-commit backup could not be taken.
    #[error("backup failed: {0}")]
    BackupFailed(String),

    /// An inbound's settings document could not be decoded.
    #[error("inbound {inbound_id}: malformed settings document: {reason}")]
    Malformed {
        /// Inbound whose document failed to decode.
        inbound_id: i64,
        /// Decoder message.
        reason: String,
    },

    /// The write transaction failed and was rolled back.
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// A settings document could not be encoded.
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),

    /// Raw database error outside of a commit.
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create an unavailable error from any error type.
    #[inline]
    pub fn unavailable<E: std::fmt::Display>(err: E) -> Self {
        Self::Unavailable(err.to_string())
    }

    /// Create a backup error from any error type.
    #[inline]
    pub fn backup_failed<E: std::fmt::Display>(err: E) -> Self {
        Self::BackupFailed(err.to_string())
    }

    /// Create a commit error from any error type.
    #[inline]
    pub fn commit_failed<E: std::fmt::Display>(err: E) -> Self {
        Self::CommitFailed(err.to_string())
    }
}
