//! Authorization-code exchange configuration.
//!
//! Describes how the callback talks to the identity provider's token
//! endpoint and how long the resulting session cookie lives.

use serde::{Deserialize, Serialize};

/// Session cookie lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieLifetime {
    /// Seven days.
    #[default]
    Week,
    /// Thirty days.
    Month,
}

impl CookieLifetime {
    /// Returns the lifetime in seconds, as sent in `Max-Age`.
    #[must_use]
    pub const fn as_seconds(self) -> i64 {
        match self {
            Self::Week => 60 * 60 * 24 * 7,
            Self::Month => 60 * 60 * 24 * 30,
        }
    }
}

/// Where the callback gets the user ID for a fresh access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Ask the identity provider's session endpoint with the bearer token.
    #[default]
    Endpoint,
    /// Verify the access token as a JWT and use its `sub` claim.
    TokenSubject,
}

/// Configuration for the authorization-code exchange.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCodeConfig {
    /// The identity provider's token endpoint.
    token_url: String,
    /// The client ID sent with every exchange. Default: "google".
    #[serde(default = "default_client_id")]
    client_id: String,
    /// The redirect URI registered with the provider. When unset it is
    /// reconstructed from the callback request's origin and path.
    #[serde(default)]
    redirect_uri: Option<String>,
    /// How the user is identified after the exchange.
    #[serde(default)]
    identity: IdentitySource,
    /// Session-resolution endpoint, required for [`IdentitySource::Endpoint`].
    #[serde(default)]
    session_url: Option<String>,
    /// Lifetime of the session cookie and record.
    #[serde(default)]
    cookie_lifetime: CookieLifetime,
}

fn default_client_id() -> String {
    "google".to_string()
}

impl AuthCodeConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(token_url: String) -> Self {
        Self {
            token_url,
            client_id: default_client_id(),
            redirect_uri: None,
            identity: IdentitySource::default(),
            session_url: None,
            cookie_lifetime: CookieLifetime::default(),
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(token_url: String) -> AuthCodeConfigBuilder {
        AuthCodeConfigBuilder {
            config: Self::new(token_url),
        }
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    #[must_use]
    pub fn identity(&self) -> IdentitySource {
        self.identity
    }

    #[must_use]
    pub fn session_url(&self) -> Option<&str> {
        self.session_url.as_deref()
    }

    #[must_use]
    pub fn cookie_lifetime(&self) -> CookieLifetime {
        self.cookie_lifetime
    }

    /// Checks combinations serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_url.trim().is_empty() {
            return Err("token_url must not be empty".to_string());
        }
        if self.identity == IdentitySource::Endpoint && self.session_url.is_none() {
            return Err("session_url is required when identity is 'endpoint'".to_string());
        }
        Ok(())
    }
}

/// Builder for [`AuthCodeConfig`].
#[derive(Debug)]
pub struct AuthCodeConfigBuilder {
    config: AuthCodeConfig,
}

impl AuthCodeConfigBuilder {
    #[must_use]
    pub fn client_id(mut self, client_id: String) -> Self {
        self.config.client_id = client_id;
        self
    }

    #[must_use]
    pub fn redirect_uri(mut self, redirect_uri: String) -> Self {
        self.config.redirect_uri = Some(redirect_uri);
        self
    }

    #[must_use]
    pub fn session_url(mut self, session_url: String) -> Self {
        self.config.identity = IdentitySource::Endpoint;
        self.config.session_url = Some(session_url);
        self
    }

    #[must_use]
    pub fn token_subject(mut self) -> Self {
        self.config.identity = IdentitySource::TokenSubject;
        self
    }

    #[must_use]
    pub fn cookie_lifetime(mut self, lifetime: CookieLifetime) -> Self {
        self.config.cookie_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn build(self) -> AuthCodeConfig {
        self.config
    }
}
