//! Session cookie construction and callback URL reconstruction.

use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use caby_platform_access::{AccessToken, CookieLifetime};
use time::Duration as TimeDuration;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "session";

/// Builds the session cookie carrying `token`.
#[must_use]
pub fn session_cookie(token: &AccessToken, lifetime: CookieLifetime, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.as_str().to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(TimeDuration::seconds(lifetime.as_seconds()))
        .build()
}

/// Builds a cookie that clears the session cookie.
#[must_use]
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}

/// Reads the access token from the session cookie, if present and non-empty.
#[must_use]
pub fn session_token(jar: &CookieJar) -> Option<AccessToken> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| AccessToken::new(cookie.value()).ok())
}

/// Reconstructs the absolute URL of the current request, without query.
///
/// The scheme comes from `X-Forwarded-Proto` when a proxy sets it, otherwise
/// `https` when cookies are secure and `http` when they are not.
#[must_use]
pub fn request_url(headers: &HeaderMap, path: &str, secure: bool) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(if secure { "https" } else { "http" });
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    format!("{scheme}://{host}{path}")
}
