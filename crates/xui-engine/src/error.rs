//! Engine error types.

use xui_store::StoreError;

/// Error raised while planning or applying a reconciliation pass.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("inbound {0} not found")]
    UnknownInbound(i64),

    #[error("inbound {0} has a malformed settings document")]
    MalformedInbound(i64),

    #[error("client {0} not found")]
    ClientNotFound(String),

    /// The email exists in several inbounds and no inbound was named.
    #[error("client {email} exists in several inbounds {inbounds:?}, name one")]
    AmbiguousClient { email: String, inbounds: Vec<i64> },

    #[error("manual actions need a single-client scope")]
    ManualRequiresClient,

    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Two mutated records share an email, so their usage row would be
    /// written twice with different values.
    #[error("email {0} is used by more than one mutated record")]
    DuplicateIdentity(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    #[inline]
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidAction(msg.into())
    }
}
