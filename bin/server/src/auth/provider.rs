//! Identity-provider clients.
//!
//! [`HttpTokenEndpoint`] performs the form-encoded code exchange.
//! The two [`IdentityResolver`] implementations map the returned access token
//! to a local user, either by asking the provider's session endpoint or by
//! reading the `sub` claim of a verified JWT.

use async_trait::async_trait;
use caby_core::UserId;
use caby_platform_access::{
    AccessToken, AuthenticationError, IdentityResolver, TokenEndpoint, TokenRequest,
    TokenResponse,
};
use caby_realtime::TokenVerifier;
use reqwest::StatusCode;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

/// Token endpoint reached over HTTP.
#[derive(Clone)]
pub struct HttpTokenEndpoint {
    client: reqwest::Client,
    token_url: String,
}

impl HttpTokenEndpoint {
    pub fn new(client: reqwest::Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
        }
    }
}

fn exchange_failure(reason: impl Into<String>) -> AuthenticationError {
    AuthenticationError::TokenExchangeFailure {
        reason: reason.into(),
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    #[instrument(skip_all, fields(url = %self.token_url))]
    async fn exchange(&self, request: &TokenRequest) -> Result<TokenResponse, AuthenticationError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(request)
            .send()
            .await
            .map_err(|e| exchange_failure(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(exchange_failure(format!("token endpoint returned {status}")));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| exchange_failure(format!("unreadable token response: {e}")))
    }
}

/// Body of the provider's session endpoint.
#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    user: Option<SessionUser>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    id: String,
}

/// Resolves users through the provider's session endpoint.
#[derive(Clone)]
pub struct EndpointIdentityResolver {
    client: reqwest::Client,
    session_url: String,
}

impl EndpointIdentityResolver {
    pub fn new(client: reqwest::Client, session_url: impl Into<String>) -> Self {
        Self {
            client,
            session_url: session_url.into(),
        }
    }
}

#[async_trait]
impl IdentityResolver for EndpointIdentityResolver {
    #[instrument(skip_all, fields(url = %self.session_url))]
    async fn resolve(&self, token: &AccessToken) -> Result<Option<UserId>, AuthenticationError> {
        let response = self
            .client
            .get(&self.session_url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| exchange_failure(format!("session request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!(%status, "session endpoint rejected token");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(exchange_failure(format!("session endpoint returned {status}")));
        }

        let envelope: SessionEnvelope = response
            .json()
            .await
            .map_err(|e| exchange_failure(format!("unreadable session response: {e}")))?;

        if !envelope.success {
            debug!(error = ?envelope.error, "session endpoint reported no session");
            return Ok(None);
        }

        Ok(envelope.user.and_then(|user| parse_user_id(&user.id)))
    }
}

/// Resolves users from the `sub` claim of a verified JWT access token.
#[derive(Debug, Clone)]
pub struct TokenSubjectResolver {
    verifier: TokenVerifier,
}

impl TokenSubjectResolver {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl IdentityResolver for TokenSubjectResolver {
    async fn resolve(&self, token: &AccessToken) -> Result<Option<UserId>, AuthenticationError> {
        let claims =
            self.verifier
                .verify(token.as_str())
                .map_err(|e| AuthenticationError::InvalidToken {
                    reason: e.to_string(),
                })?;
        Ok(parse_user_id(&claims.sub))
    }
}

fn parse_user_id(raw: &str) -> Option<UserId> {
    match UserId::from_str(raw) {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(error = %e, "identity provider returned an unknown user id format");
            None
        }
    }
}
