//! Session resolution for authenticated requests.
//!
//! [`SessionAccessor`] turns the access token carried by the session cookie
//! into an [`AuthenticatedUser`]. The web layer wraps it in extractors.

use crate::error::AuthenticationError;
use crate::session::{AccessToken, Session};
use crate::store::{AccountStore, SessionStore};
use crate::user::User;
use caby_core::{OrganizationId, SessionId, UserId};
use std::sync::Arc;
use tracing::debug;

/// The user and session behind an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    session: Session,
    user: User,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn new(session: Session, user: User) -> Self {
        Self { session, user }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.session.user_id()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// The organization selected for this session, if any.
    #[must_use]
    pub fn organization_id(&self) -> Option<OrganizationId> {
        self.session.organization_id()
    }
}

/// Result of resolving a session cookie.
#[derive(Debug)]
pub enum AuthResult {
    /// A live session for a known user.
    Authenticated(Box<AuthenticatedUser>),
    /// No session holds the token, or its user no longer exists.
    Unauthenticated,
    /// The session existed but had expired; it has been deleted.
    SessionExpired { session_id: SessionId },
}

/// Resolves session cookies against the session and account stores.
#[derive(Clone)]
pub struct SessionAccessor {
    sessions: Arc<dyn SessionStore>,
    accounts: Arc<dyn AccountStore>,
}

impl SessionAccessor {
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStore>, accounts: Arc<dyn AccountStore>) -> Self {
        Self { sessions, accounts }
    }

    /// Resolves the session holding `token`.
    ///
    /// Expired sessions are deleted on sight.
    ///
    /// # Errors
    ///
    /// Only storage failures are errors; every other outcome is an [`AuthResult`].
    pub async fn resolve(&self, token: &AccessToken) -> Result<AuthResult, AuthenticationError> {
        let Some(session) = self.sessions.find_by_access_token(token).await? else {
            return Ok(AuthResult::Unauthenticated);
        };

        if session.is_expired() {
            debug!(session_id = %session.id(), "deleting expired session");
            self.sessions.delete(session.id()).await?;
            return Ok(AuthResult::SessionExpired {
                session_id: session.id(),
            });
        }

        match self.accounts.find_user(session.user_id()).await? {
            Some(user) => Ok(AuthResult::Authenticated(Box::new(AuthenticatedUser::new(
                session, user,
            )))),
            None => {
                debug!(user_id = %session.user_id(), "session refers to a missing user");
                Ok(AuthResult::Unauthenticated)
            }
        }
    }

    /// Ends the session holding `token`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn end(&self, token: &AccessToken) -> Result<Option<SessionId>, AuthenticationError> {
        match self.sessions.find_by_access_token(token).await? {
            Some(session) => {
                self.sessions.delete(session.id()).await?;
                Ok(Some(session.id()))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryAccountStore, InMemorySessionStore};
    use chrono::Duration;

    fn token(raw: &str) -> AccessToken {
        AccessToken::new(raw).expect("non-empty")
    }

    async fn setup() -> (SessionAccessor, InMemorySessionStore, User) {
        let sessions = InMemorySessionStore::new();
        let accounts = InMemoryAccountStore::new();
        let user = User::new("Driver".to_string(), "driver@caby.ch".to_string());
        accounts.insert_user(user.clone()).await;
        let accessor = SessionAccessor::new(Arc::new(sessions.clone()), Arc::new(accounts));
        (accessor, sessions, user)
    }

    #[tokio::test]
    async fn resolves_live_session() {
        let (accessor, sessions, user) = setup().await;
        let session = Session::new(user.id(), token("at"), None, Duration::hours(1));
        sessions.create(&session).await.expect("create");

        match accessor.resolve(&token("at")).await.expect("resolve") {
            AuthResult::Authenticated(auth) => {
                assert_eq!(auth.user_id(), user.id());
                assert_eq!(auth.user().email(), "driver@caby.ch");
            }
            other => panic!("expected authenticated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_token_is_unauthenticated() {
        let (accessor, _, _) = setup().await;
        let result = accessor.resolve(&token("nope")).await.expect("resolve");
        assert!(matches!(result, AuthResult::Unauthenticated));
    }

    #[tokio::test]
    async fn expired_session_is_deleted() {
        let (accessor, sessions, user) = setup().await;
        let session = Session::new(user.id(), token("old"), None, Duration::seconds(-1));
        sessions.create(&session).await.expect("create");

        let result = accessor.resolve(&token("old")).await.expect("resolve");
        assert!(matches!(
            result,
            AuthResult::SessionExpired { session_id } if session_id == session.id()
        ));
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn session_of_deleted_user_is_unauthenticated() {
        let (accessor, sessions, _) = setup().await;
        let orphan = Session::new(UserId::new(), token("orphan"), None, Duration::hours(1));
        sessions.create(&orphan).await.expect("create");

        let result = accessor.resolve(&token("orphan")).await.expect("resolve");
        assert!(matches!(result, AuthResult::Unauthenticated));
    }

    #[tokio::test]
    async fn end_removes_session() {
        let (accessor, sessions, user) = setup().await;
        let session = Session::new(user.id(), token("at"), None, Duration::hours(1));
        sessions.create(&session).await.expect("create");

        assert_eq!(
            accessor.end(&token("at")).await.expect("end"),
            Some(session.id())
        );
        assert!(sessions.is_empty().await);
        assert_eq!(accessor.end(&token("at")).await.expect("end"), None);
    }
}
