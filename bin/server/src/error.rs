//! Handler-level error types.
//!
//! Domain errors are logged with their details and turned into user-safe
//! JSON responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use caby_mail::MailError;
use caby_realtime::RealtimeError;
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request body could not be used.
    BadRequest { details: String },
    /// A mail operation failed.
    Mail(MailError),
    /// A realtime operation failed.
    Realtime(RealtimeError),
    /// The caller did not present valid credentials.
    Unauthorized,
    /// A required collaborator is not configured.
    Unavailable { feature: &'static str },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest { details } => write!(f, "bad request: {details}"),
            Self::Mail(e) => write!(f, "{e}"),
            Self::Realtime(e) => write!(f, "{e}"),
            Self::Unauthorized => write!(f, "missing or invalid credentials"),
            Self::Unavailable { feature } => write!(f, "{feature} is not configured"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        Self::Mail(e)
    }
}

impl From<RealtimeError> for ApiError {
    fn from(e: RealtimeError) -> Self {
        Self::Realtime(e)
    }
}

impl ApiError {
    /// Status code and user-safe message.
    fn public_parts(&self) -> (StatusCode, String) {
        match self {
            Self::BadRequest { details } => (StatusCode::BAD_REQUEST, details.clone()),
            Self::Mail(MailError::NotAllowed { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            Self::Mail(MailError::InvalidAddress { .. })
            | Self::Mail(MailError::InvalidNotification { .. }) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::Mail(MailError::Provider { .. }) => {
                (StatusCode::BAD_GATEWAY, "mail provider error".to_string())
            }
            Self::Mail(MailError::Storage { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            Self::Realtime(RealtimeError::InvalidToken { .. }) => {
                (StatusCode::UNAUTHORIZED, "invalid token".to_string())
            }
            Self::Realtime(_) => (StatusCode::BAD_GATEWAY, "realtime bus error".to_string()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            Self::Unavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.public_parts();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }
        (
            status,
            Json(json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: ApiError) -> StatusCode {
        e.into_response().status()
    }

    #[test]
    fn mail_errors_map_to_statuses() {
        assert_eq!(
            status_of(
                MailError::NotAllowed {
                    email: "a@b.ch".to_string(),
                    reason: "bounce".to_string()
                }
                .into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(
                MailError::Provider {
                    details: "timeout".to_string()
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(MailError::storage("pool closed").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_details_stay_private() {
        let (_, message) = ApiError::from(MailError::storage("password=hunter2")).public_parts();
        assert!(!message.contains("hunter2"));
    }

    #[test]
    fn invalid_realtime_token_is_unauthorized() {
        let e = RealtimeError::InvalidToken {
            reason: "expired".to_string(),
        };
        assert_eq!(status_of(e.into()), StatusCode::UNAUTHORIZED);
    }
}
