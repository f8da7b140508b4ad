//! Error types for the platform-access crate.
//!
//! Every variant carries a stable machine code (see
//! [`AuthenticationError::code`]) that the HTTP layer puts in the
//! `error` query parameter of the error redirect.

use caby_core::UserId;
use std::fmt;

/// Errors from authentication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The callback request carried no authorization code.
    MissingCode,
    /// The token endpoint could not be reached or answered with an error.
    TokenExchangeFailure { reason: String },
    /// The token endpoint answered without a usable access token.
    MissingAccessToken,
    /// The access token did not resolve to a known user.
    MissingUser { user_id: Option<UserId> },
    /// A bearer token failed verification.
    InvalidToken { reason: String },
    /// The session or account store failed.
    Storage { reason: String },
}

impl AuthenticationError {
    /// Returns the machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCode => "missing_code",
            Self::TokenExchangeFailure { .. } => "exchange_failed",
            Self::MissingAccessToken => "missing_access_token",
            Self::MissingUser { .. } => "missing_user",
            Self::InvalidToken { .. } => "invalid_token",
            Self::Storage { .. } => "internal",
        }
    }

    /// Wraps a storage-layer error.
    pub fn storage(err: impl fmt::Display) -> Self {
        Self::Storage {
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCode => write!(f, "authorization code missing from callback"),
            Self::TokenExchangeFailure { reason } => {
                write!(f, "token exchange failed: {reason}")
            }
            Self::MissingAccessToken => write!(f, "token response has no access token"),
            Self::MissingUser { user_id: Some(id) } => write!(f, "user {id} not found"),
            Self::MissingUser { user_id: None } => {
                write!(f, "access token does not identify a user")
            }
            Self::InvalidToken { reason } => write!(f, "invalid token: {reason}"),
            Self::Storage { reason } => write!(f, "session storage error: {reason}"),
        }
    }
}

impl std::error::Error for AuthenticationError {}
