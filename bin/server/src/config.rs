//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nesting levels (`AUTH__TOKEN_URL`, `MAIL__SMTP__HOST`, ...).
//!
//! See [`AuthCodeConfig`](caby_platform_access::AuthCodeConfig) for the
//! authorization-code exchange settings flattened into [`AuthConfig`].

use caby_mail::{DEFAULT_DISPLAY_NAME, SmtpSettings};
use caby_platform_access::AuthCodeConfig;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Socket address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Deployment identity.
    #[serde(default)]
    pub app: AppConfig,

    /// Authentication and session settings.
    pub auth: AuthConfig,

    /// Realtime transport settings.
    pub realtime: RealtimeConfig,

    /// Transactional mail settings.
    pub mail: MailConfig,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

/// Application name and stage; together they scope realtime topics.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_stage")]
    pub stage: String,
}

fn default_app_name() -> String {
    "caby".to_string()
}

fn default_stage() -> String {
    "dev".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            stage: default_stage(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Token endpoint, client and cookie lifetime.
    #[serde(flatten)]
    pub exchange: AuthCodeConfig,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Interval between expired-session cleanup runs, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    /// Timeout for calls to the identity provider, in seconds.
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
}

fn default_secure_cookies() -> bool {
    true
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

fn default_http_timeout_seconds() -> u64 {
    10
}

/// Realtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// HS256 secret realtime bearer tokens are signed with.
    pub token_secret: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    /// NATS server for publishing events. Publishing is disabled when unset.
    #[serde(default)]
    pub nats_url: Option<String>,
}

/// Mail configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Domain appended to sender local parts.
    pub sender_domain: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// SMTP relay. Sending fails when unset.
    #[serde(default)]
    pub smtp: Option<SmtpSettings>,
    /// Shared secret the delivery-notification webhooks require, as the
    /// `token` query parameter or the `X-Webhook-Token` header. The webhooks
    /// reject every request when unset.
    #[serde(default)]
    pub webhook_token: Option<String>,
}

fn default_display_name() -> String {
    DEFAULT_DISPLAY_NAME.to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Checks constraints the types cannot express.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        self.auth.exchange.validate()?;
        if self.auth.cleanup_interval_seconds == 0 {
            return Err("auth cleanup interval must be positive".to_string());
        }
        if self.realtime.token_secret.is_empty() {
            return Err("realtime token secret must not be empty".to_string());
        }
        if self
            .mail
            .webhook_token
            .as_deref()
            .is_some_and(|token| token.trim().is_empty())
        {
            return Err("mail webhook token must not be blank".to_string());
        }
        if self.mail.sender_domain.trim().is_empty() || self.mail.sender_domain.contains('@') {
            return Err("mail sender domain must be a bare domain".to_string());
        }
        Ok(())
    }
}
