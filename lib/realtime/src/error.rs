//! Realtime error types.

use std::fmt;

/// Errors from token verification and event publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeError {
    /// The bearer token is missing, malformed, expired or badly signed.
    InvalidToken {
        /// Why verification failed.
        reason: String,
    },
    /// Could not connect to the message bus.
    ConnectionFailed {
        /// Error details.
        details: String,
    },
    /// Publishing an event failed.
    PublishFailed {
        /// Error details.
        details: String,
    },
}

impl RealtimeError {
    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RealtimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken { reason } => write!(f, "invalid realtime token: {reason}"),
            Self::ConnectionFailed { details } => {
                write!(f, "failed to connect to the message bus: {details}")
            }
            Self::PublishFailed { details } => write!(f, "failed to publish event: {details}"),
        }
    }
}

impl std::error::Error for RealtimeError {}
