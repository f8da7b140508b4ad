//! PostgreSQL session and account stores.

use async_trait::async_trait;
use caby_core::{OrganizationId, SessionId, UserId};
use caby_platform_access::{
    AccessToken, AccountStore, AuthenticationError, Session, SessionStore, User,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// Wraps a malformed column value as a decode error.
pub(crate) fn decode_error(what: &str, value: &str, reason: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid {what} '{value}': {reason}"),
    )))
}

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, sqlx::Error> {
        let id = UserId::from_str(&self.id).map_err(|e| decode_error("user id", &self.id, e))?;
        Ok(User::with_all_fields(
            id,
            self.name,
            self.email,
            self.email_verified,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// Row type for session queries.
#[derive(FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    access_token: String,
    organization_id: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, sqlx::Error> {
        let id =
            SessionId::from_str(&self.id).map_err(|e| decode_error("session id", &self.id, e))?;
        let user_id = UserId::from_str(&self.user_id)
            .map_err(|e| decode_error("user id", &self.user_id, e))?;
        let organization_id = self
            .organization_id
            .as_deref()
            .map(|raw| {
                OrganizationId::from_str(raw).map_err(|e| decode_error("organization id", raw, e))
            })
            .transpose()?;
        let access_token = AccessToken::new(self.access_token)
            .map_err(|e| decode_error("access token", "<redacted>", e))?;

        Ok(Session::with_all_fields(
            id,
            user_id,
            access_token,
            organization_id,
            self.created_at,
            self.expires_at,
        ))
    }
}

/// PostgreSQL [`SessionStore`].
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, session: &Session) -> Result<(), AuthenticationError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, access_token, organization_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(session.id().to_string())
        .bind(session.user_id().to_string())
        .bind(session.access_token().as_str())
        .bind(session.organization_id().map(|id| id.to_string()))
        .bind(session.created_at())
        .bind(session.expires_at())
        .execute(&self.pool)
        .await
        .map_err(AuthenticationError::storage)?;

        Ok(())
    }

    async fn find_by_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<Option<Session>, AuthenticationError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, access_token, organization_id, created_at, expires_at
            FROM sessions
            WHERE access_token = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(AuthenticationError::storage)?;

        row.map(SessionRow::try_into_session)
            .transpose()
            .map_err(AuthenticationError::storage)
    }

    async fn delete(&self, id: SessionId) -> Result<(), AuthenticationError> {
        sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(AuthenticationError::storage)?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, AuthenticationError> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(AuthenticationError::storage)?;

        Ok(result.rows_affected())
    }
}

/// PostgreSQL [`AccountStore`] over the `users` and `organizations` tables.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, AuthenticationError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, email_verified, created_at, updated_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(AuthenticationError::storage)?;

        row.map(UserRow::try_into_user)
            .transpose()
            .map_err(AuthenticationError::storage)
    }

    async fn last_created_organization(
        &self,
        owner: UserId,
    ) -> Result<Option<OrganizationId>, AuthenticationError> {
        let id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM organizations
            WHERE owner_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(owner.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(AuthenticationError::storage)?;

        id.map(|raw| {
            OrganizationId::from_str(&raw)
                .map_err(|e| AuthenticationError::storage(decode_error("organization id", &raw, e)))
        })
        .transpose()
    }
}
