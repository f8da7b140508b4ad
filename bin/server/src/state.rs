//! Shared application state.
//!
//! Every outbound client and store is constructed once at startup and
//! injected here; handlers reach them through `State<Arc<AppState>>`.

use crate::config::ServerConfig;
use caby_mail::{MailGate, MailProvider, NotificationIngestor, SuppressionStore};
use caby_platform_access::{
    AccountStore, AuthCodeExchange, IdentityResolver, SessionAccessor, SessionStore,
    TokenEndpoint,
};
use caby_realtime::{RealtimePublisher, TokenVerifier, TopicAuthorizer, TopicPrefix};
use std::sync::Arc;

/// External collaborators the state is assembled from.
pub struct Collaborators {
    pub token_endpoint: Arc<dyn TokenEndpoint>,
    pub identity: Arc<dyn IdentityResolver>,
    pub sessions: Arc<dyn SessionStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub suppression: Arc<dyn SuppressionStore>,
    pub mail_provider: Arc<dyn MailProvider>,
    pub publisher: Option<Arc<dyn RealtimePublisher>>,
}

/// Shared application state.
pub struct AppState {
    /// Completes identity-provider callbacks.
    pub exchange: AuthCodeExchange,
    /// Resolves session cookies.
    pub sessions: SessionAccessor,
    /// Grants realtime topics.
    pub authorizer: TopicAuthorizer,
    /// Publishes realtime events, when a bus is configured.
    pub publisher: Option<Arc<dyn RealtimePublisher>>,
    /// Suppression-checked mail sending.
    pub mail: MailGate,
    /// Bounce and complaint webhook ingestion.
    pub notifications: NotificationIngestor,
    /// Shared secret for the delivery-notification webhooks.
    pub webhook_token: Option<String>,
    /// Whether cookies carry the Secure flag.
    pub secure_cookies: bool,
}

impl AppState {
    /// Assembles the state from configuration and collaborators.
    pub fn new(config: &ServerConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            token_endpoint,
            identity,
            sessions,
            accounts,
            suppression,
            mail_provider,
            publisher,
        } = collaborators;

        let verifier = TokenVerifier::new(
            config.realtime.token_secret.as_bytes(),
            config.realtime.issuer.as_deref(),
            config.realtime.audience.as_deref(),
        );
        let prefix = TopicPrefix::new(&config.app.name, &config.app.stage);

        Self {
            exchange: AuthCodeExchange::new(
                config.auth.exchange.clone(),
                token_endpoint,
                identity,
                accounts.clone(),
                sessions.clone(),
            ),
            sessions: SessionAccessor::new(sessions, accounts),
            authorizer: TopicAuthorizer::new(prefix, verifier),
            publisher,
            mail: MailGate::new(
                config.mail.sender_domain.clone(),
                suppression.clone(),
                mail_provider,
            )
            .with_display_name(config.mail.display_name.clone()),
            notifications: NotificationIngestor::new(suppression),
            webhook_token: config.mail.webhook_token.clone(),
            secure_cookies: config.auth.secure_cookies,
        }
    }

    /// Topic prefix of this deployment.
    #[must_use]
    pub fn topic_prefix(&self) -> &TopicPrefix {
        self.authorizer.prefix()
    }
}
