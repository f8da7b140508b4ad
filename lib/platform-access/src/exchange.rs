//! The authorization-code exchange.
//!
//! Runs once per identity-provider redirect:
//! 1. Validate that a code is present
//! 2. Exchange it at the token endpoint
//! 3. Resolve the user behind the access token
//! 4. Persist a session carrying the access token
//!
//! Every step is a single attempt; the first failure ends the exchange.

use crate::config::{AuthCodeConfig, CookieLifetime};
use crate::error::AuthenticationError;
use crate::session::{AccessToken, Session};
use crate::store::{AccountStore, SessionStore};
use crate::user::User;
use async_trait::async_trait;
use caby_core::UserId;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Form body sent to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub client_id: String,
    pub code: String,
    pub redirect_uri: String,
}

impl TokenRequest {
    /// Builds an `authorization_code` grant request.
    #[must_use]
    pub fn authorization_code(client_id: &str, code: &str, redirect_uri: &str) -> Self {
        Self {
            grant_type: "authorization_code".to_string(),
            client_id: client_id.to_string(),
            code: code.to_string(),
            redirect_uri: redirect_uri.to_string(),
        }
    }
}

/// The parts of a token endpoint response this service reads.
///
/// `access_token` is optional here so a response without one is reported
/// as [`AuthenticationError::MissingAccessToken`] rather than a decode error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// The identity provider's token endpoint.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchanges a grant for tokens.
    ///
    /// Transport failures and non-success statuses are
    /// [`AuthenticationError::TokenExchangeFailure`].
    async fn exchange(&self, request: &TokenRequest) -> Result<TokenResponse, AuthenticationError>;
}

/// Maps an access token to the user it was issued for.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns the user ID, or `None` if the token identifies nobody.
    async fn resolve(&self, token: &AccessToken) -> Result<Option<UserId>, AuthenticationError>;
}

/// Outcome of a successful exchange.
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub session: Session,
    pub user: User,
    pub cookie_lifetime: CookieLifetime,
}

/// Completes authorization-code callbacks.
pub struct AuthCodeExchange {
    config: AuthCodeConfig,
    tokens: Arc<dyn TokenEndpoint>,
    identity: Arc<dyn IdentityResolver>,
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<dyn SessionStore>,
}

impl AuthCodeExchange {
    /// Creates an exchange over the given collaborators.
    #[must_use]
    pub fn new(
        config: AuthCodeConfig,
        tokens: Arc<dyn TokenEndpoint>,
        identity: Arc<dyn IdentityResolver>,
        accounts: Arc<dyn AccountStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            tokens,
            identity,
            accounts,
            sessions,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AuthCodeConfig {
        &self.config
    }

    /// Completes a callback.
    ///
    /// `request_uri` is the callback URL without its query; it is sent as the
    /// redirect URI unless one is configured.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's [`AuthenticationError`]. No session
    /// is stored unless every step succeeds.
    #[instrument(skip_all, fields(client_id = %self.config.client_id()))]
    pub async fn complete(
        &self,
        code: Option<&str>,
        request_uri: &str,
    ) -> Result<EstablishedSession, AuthenticationError> {
        let code = code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(AuthenticationError::MissingCode)?;

        let redirect_uri = self.config.redirect_uri().unwrap_or(request_uri);
        let request = TokenRequest::authorization_code(self.config.client_id(), code, redirect_uri);

        let response = self.tokens.exchange(&request).await?;

        let access_token = response
            .access_token
            .and_then(|raw| AccessToken::new(raw).ok())
            .ok_or_else(|| {
                warn!("token endpoint answered without an access token");
                AuthenticationError::MissingAccessToken
            })?;

        let user_id = self
            .identity
            .resolve(&access_token)
            .await?
            .ok_or(AuthenticationError::MissingUser { user_id: None })?;

        let user = self
            .accounts
            .find_user(user_id)
            .await?
            .ok_or(AuthenticationError::MissingUser {
                user_id: Some(user_id),
            })?;

        let organization_id = self.accounts.last_created_organization(user_id).await?;

        let lifetime = self.config.cookie_lifetime();
        let session = Session::new(
            user.id(),
            access_token,
            organization_id,
            Duration::seconds(lifetime.as_seconds()),
        );
        self.sessions.create(&session).await?;

        info!(
            user_id = %user.id(),
            session_id = %session.id(),
            organization_id = ?organization_id,
            "session established"
        );

        Ok(EstablishedSession {
            session,
            user,
            cookie_lifetime: lifetime,
        })
    }
}
