//! Storage seams for sessions and accounts.
//!
//! The server implements these over PostgreSQL; [`crate::memory`] provides
//! in-process implementations for tests and local development.

use crate::error::AuthenticationError;
use crate::session::{AccessToken, Session};
use crate::user::User;
use async_trait::async_trait;
use caby_core::{OrganizationId, SessionId, UserId};

/// Persistence for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores a new session.
    async fn create(&self, session: &Session) -> Result<(), AuthenticationError>;

    /// Finds the session holding the given access token.
    async fn find_by_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<Option<Session>, AuthenticationError>;

    /// Deletes a session (logout).
    async fn delete(&self, id: SessionId) -> Result<(), AuthenticationError>;

    /// Deletes expired sessions, returning how many were removed.
    async fn delete_expired(&self) -> Result<u64, AuthenticationError>;
}

/// Read access to users and their organizations.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Finds a user by ID.
    async fn find_user(&self, id: UserId) -> Result<Option<User>, AuthenticationError>;

    /// Returns the organization the user created most recently, if any.
    async fn last_created_organization(
        &self,
        owner: UserId,
    ) -> Result<Option<OrganizationId>, AuthenticationError>;
}
