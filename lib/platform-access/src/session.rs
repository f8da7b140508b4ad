//! Session management for authenticated users.
//!
//! A session is created by a successful authorization-code exchange and
//! carries the identity provider's access token. The browser holds the
//! same access token in the session cookie; the server looks the session
//! up by it on every authenticated request.

use caby_core::{OrganizationId, SessionId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-empty bearer access token issued by the identity provider.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessToken(String);

/// Returned when constructing an [`AccessToken`] from an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyAccessToken;

impl fmt::Display for EmptyAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "access token is empty")
    }
}

impl std::error::Error for EmptyAccessToken {}

impl AccessToken {
    /// Wraps a token, rejecting empty or whitespace-only strings.
    pub fn new(token: impl Into<String>) -> Result<Self, EmptyAccessToken> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(EmptyAccessToken);
        }
        Ok(Self(token))
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

impl TryFrom<String> for AccessToken {
    type Error = EmptyAccessToken;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccessToken> for String {
    fn from(token: AccessToken) -> Self {
        token.0
    }
}

/// An active authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    access_token: AccessToken,
    /// Organization the user was working in when the session started.
    organization_id: Option<OrganizationId>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Starts a new session valid for `duration`.
    #[must_use]
    pub fn new(
        user_id: UserId,
        access_token: AccessToken,
        organization_id: Option<OrganizationId>,
        duration: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            user_id,
            access_token,
            organization_id,
            created_at: now,
            expires_at: now + duration,
        }
    }

    /// Reconstitutes a session from storage.
    #[must_use]
    pub fn with_all_fields(
        id: SessionId,
        user_id: UserId,
        access_token: AccessToken,
        organization_id: Option<OrganizationId>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            access_token,
            organization_id,
            created_at,
            expires_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    #[must_use]
    pub fn organization_id(&self) -> Option<OrganizationId> {
        self.organization_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Switches the session to another organization.
    pub fn set_organization(&mut self, organization_id: Option<OrganizationId>) {
        self.organization_id = organization_id;
    }
}
