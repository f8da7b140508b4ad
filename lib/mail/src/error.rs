//! Mail error types.

use std::fmt;

/// Errors from the mail gate, its stores and providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    /// The recipient has an enabled bounce or complaint record.
    NotAllowed {
        /// The rejected recipient.
        email: String,
        /// Which record blocked the send.
        reason: String,
    },
    /// A sender or recipient address is malformed.
    InvalidAddress {
        address: String,
        details: String,
    },
    /// The mail provider failed to accept the message.
    Provider {
        /// Error details.
        details: String,
    },
    /// Reading or writing suppression records failed.
    Storage {
        /// Error details.
        details: String,
    },
    /// A delivery notification could not be parsed.
    InvalidNotification {
        /// Error details.
        details: String,
    },
}

impl MailError {
    pub fn storage(details: impl fmt::Display) -> Self {
        Self::Storage {
            details: details.to_string(),
        }
    }

    pub(crate) fn invalid_notification(details: impl Into<String>) -> Self {
        Self::InvalidNotification {
            details: details.into(),
        }
    }
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAllowed { email, reason } => write!(
                f,
                "the email '{email}' is not allowed to be sent to. Reason: {reason}"
            ),
            Self::InvalidAddress { address, details } => {
                write!(f, "invalid address '{address}': {details}")
            }
            Self::Provider { details } => write!(f, "mail provider error: {details}"),
            Self::Storage { details } => write!(f, "suppression store error: {details}"),
            Self::InvalidNotification { details } => {
                write!(f, "invalid delivery notification: {details}")
            }
        }
    }
}

impl std::error::Error for MailError {}
