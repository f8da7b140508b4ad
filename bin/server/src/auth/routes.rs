//! Authentication routes: callback, logout, error page and session lookup.

use axum::{
    Json,
    extract::{OriginalUri, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use caby_platform_access::AuthResult;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::cookie::{removal_cookie, request_url, session_cookie, session_token};
use crate::state::AppState;

/// Error codes the error page will echo back.
const KNOWN_ERROR_CODES: &[&str] = &[
    "missing_code",
    "exchange_failed",
    "missing_access_token",
    "missing_user",
    "invalid_token",
    "internal",
];

/// Query parameters for the identity-provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
}

/// Completes the authorization-code flow and sets the session cookie.
///
/// Every failure redirects to `/auth/error` with a machine code.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let request_uri = request_url(&headers, uri.path(), state.secure_cookies);

    match state
        .exchange
        .complete(query.code.as_deref(), &request_uri)
        .await
    {
        Ok(established) => {
            let cookie = session_cookie(
                established.session.access_token(),
                established.cookie_lifetime,
                state.secure_cookies,
            );
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Err(e) => {
            warn!(error = %e, code = e.code(), "authorization callback failed");
            Redirect::to(&format!("/auth/error?error={}", e.code())).into_response()
        }
    }
}

/// Ends the current session and clears the cookie.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    if let Some(token) = session_token(&jar) {
        match state.sessions.end(&token).await {
            Ok(Some(session_id)) => info!(%session_id, "session ended"),
            Ok(None) => {}
            Err(e) => error!(error = %e, "failed to delete session"),
        }
    }

    (jar.remove(removal_cookie()), Redirect::to("/"))
}

/// Query parameters for the error page.
#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    #[serde(default)]
    error: Option<String>,
}

/// Shows an authentication error code.
pub async fn auth_error(Query(query): Query<ErrorQuery>) -> impl IntoResponse {
    let code = query
        .error
        .as_deref()
        .filter(|code| KNOWN_ERROR_CODES.contains(code))
        .unwrap_or("unknown");

    (
        StatusCode::BAD_REQUEST,
        format!("Authentication failed: {code}"),
    )
}

/// Returns the user behind the session cookie.
pub async fn session_info(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let Some(token) = session_token(&jar) else {
        return unauthenticated("no session cookie");
    };

    match state.sessions.resolve(&token).await {
        Ok(AuthResult::Authenticated(auth)) => Json(json!({
            "success": true,
            "user": auth.user(),
            "organization_id": auth.organization_id(),
        }))
        .into_response(),
        Ok(AuthResult::Unauthenticated) => unauthenticated("no session"),
        Ok(AuthResult::SessionExpired { .. }) => unauthenticated("session expired"),
        Err(e) => {
            error!(error = %e, "session lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "internal" })),
            )
                .into_response()
        }
    }
}

fn unauthenticated(reason: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": reason })),
    )
        .into_response()
}
