//! In-memory session and account stores.
//!
//! Suitable for tests and local development; nothing survives a restart.

use crate::error::AuthenticationError;
use crate::session::{AccessToken, Session};
use crate::store::{AccountStore, SessionStore};
use crate::user::User;
use async_trait::async_trait;
use caby_core::{OrganizationId, SessionId, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory [`SessionStore`].
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: &Session) -> Result<(), AuthenticationError> {
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());
        Ok(())
    }

    async fn find_by_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<Option<Session>, AuthenticationError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.access_token() == token)
            .max_by_key(|s| s.created_at())
            .cloned())
    }

    async fn delete(&self, id: SessionId) -> Result<(), AuthenticationError> {
        self.sessions.write().await.remove(&id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, AuthenticationError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        Ok((before - sessions.len()) as u64)
    }
}

#[derive(Default)]
struct Accounts {
    users: HashMap<UserId, User>,
    organizations: Vec<(OrganizationId, UserId, DateTime<Utc>)>,
}

/// In-memory [`AccountStore`].
#[derive(Clone, Default)]
pub struct InMemoryAccountStore {
    inner: Arc<RwLock<Accounts>>,
}

impl InMemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub async fn insert_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id(), user);
    }

    /// Records an organization owned by `owner`, created at `created_at`.
    pub async fn insert_organization(
        &self,
        id: OrganizationId,
        owner: UserId,
        created_at: DateTime<Utc>,
    ) {
        self.inner
            .write()
            .await
            .organizations
            .push((id, owner, created_at));
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, AuthenticationError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn last_created_organization(
        &self,
        owner: UserId,
    ) -> Result<Option<OrganizationId>, AuthenticationError> {
        let inner = self.inner.read().await;
        Ok(inner
            .organizations
            .iter()
            .filter(|(_, o, _)| *o == owner)
            .max_by_key(|(_, _, created_at)| *created_at)
            .map(|(id, _, _)| *id))
    }
}
