//! Authentication extractors for Axum.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use caby_platform_access::{AuthResult, AuthenticatedUser};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

use super::cookie::session_token;
use crate::state::AppState;

/// Extractor for requiring an authenticated user.
///
/// Requests without a live session are rejected with 401.
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRejection::InternalError)?;

        let token = session_token(&jar).ok_or(AuthRejection::NotAuthenticated)?;

        match app_state.sessions.resolve(&token).await {
            Ok(AuthResult::Authenticated(user)) => Ok(RequireAuth(*user)),
            Ok(AuthResult::Unauthenticated) => Err(AuthRejection::NotAuthenticated),
            Ok(AuthResult::SessionExpired { session_id }) => {
                debug!(%session_id, "rejected expired session");
                Err(AuthRejection::SessionExpired)
            }
            Err(e) => {
                error!(error = %e, "failed to resolve session");
                Err(AuthRejection::InternalError)
            }
        }
    }
}

/// Rejection type for authentication extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    NotAuthenticated,
    SessionExpired,
    InternalError,
}

impl AuthRejection {
    fn code(self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::SessionExpired => "session_expired",
            Self::InternalError => "internal",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NotAuthenticated | Self::SessionExpired => StatusCode::UNAUTHORIZED,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(json!({ "success": false, "error": self.code() })),
        )
            .into_response()
    }
}
