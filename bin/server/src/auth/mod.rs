//! Authentication for the caby server.
//!
//! This module provides:
//! - The authorization-code callback, logout and error routes
//! - HTTP clients for the identity provider's token and session endpoints
//! - PostgreSQL-backed session and account stores
//! - Cookie-based extractors for authenticated routes
//!
//! The session cookie carries the access token issued by the identity
//! provider; sessions are looked up by that token.

pub mod cookie;
pub mod db;
pub mod middleware;
pub mod provider;
pub mod routes;

pub use middleware::{AuthRejection, RequireAuth};
pub use provider::{EndpointIdentityResolver, HttpTokenEndpoint, TokenSubjectResolver};
pub use routes::{auth_error, callback, logout, session_info};

use caby_platform_access::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Deletes expired sessions once now, then every `interval`.
pub fn spawn_session_cleanup(
    store: Arc<dyn SessionStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut first = true;
        loop {
            ticker.tick().await;
            match store.delete_expired().await {
                Ok(count) if count > 0 && first => {
                    info!(deleted_sessions = count, "cleaned up expired sessions on startup");
                }
                Ok(count) if count > 0 => {
                    debug!(deleted_sessions = count, "periodic session cleanup");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "failed to clean up expired sessions");
                }
            }
            first = false;
        }
    })
}
