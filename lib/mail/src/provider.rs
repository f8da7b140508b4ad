//! Transactional mail providers.

use crate::error::MailError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde::Deserialize;
use tracing::{info, instrument, warn};

/// A plain-text message ready for a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub display_name: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Builds the RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::InvalidAddress`] if either address does not parse.
    pub fn to_message(&self) -> Result<Message, MailError> {
        let from = parse_address(&self.from)?;
        let to = parse_address(&self.to)?;

        Message::builder()
            .from(Mailbox::new(Some(self.display_name.clone()), from))
            .to(Mailbox::new(None, to))
            .subject(&self.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(self.body.clone())
            .map_err(|e| MailError::Provider {
                details: format!("failed to build message: {e}"),
            })
    }
}

fn parse_address(address: &str) -> Result<Address, MailError> {
    address
        .parse::<Address>()
        .map_err(|e| MailError::InvalidAddress {
            address: address.to_string(),
            details: e.to_string(),
        })
}

/// Delivers mail. Returns the provider's message id when it reports one.
#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> caby_core::Result<Option<String>, MailError>;
}

/// SMTP relay settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
}

fn default_smtp_port() -> u16 {
    587
}

/// [`MailProvider`] over an authenticated STARTTLS relay.
#[derive(Clone)]
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpProvider {
    /// Creates the relay transport. No connection is made until the first send.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay host is invalid.
    pub fn new(settings: &SmtpSettings) -> caby_core::Result<Self, MailError> {
        let credentials = Credentials::new(settings.username.clone(), settings.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| MailError::Provider {
                details: format!("failed to create SMTP relay: {e}"),
            })?
            .port(settings.port)
            .credentials(credentials)
            .build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl MailProvider for SmtpProvider {
    #[instrument(skip_all, fields(to = %mail.to))]
    async fn send(&self, mail: &OutgoingMail) -> caby_core::Result<Option<String>, MailError> {
        let message = mail.to_message()?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Provider {
                details: format!("failed to send mail: {e}"),
            })?;

        let message_id = response.message().next().map(str::to_string);
        info!(message_id = ?message_id, "mail accepted by relay");
        Ok(message_id)
    }
}

/// [`MailProvider`] used when no transport is configured. Every send fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledProvider;

#[async_trait]
impl MailProvider for DisabledProvider {
    async fn send(&self, mail: &OutgoingMail) -> caby_core::Result<Option<String>, MailError> {
        warn!(to = %mail.to, "mail transport not configured, dropping mail");
        Err(MailError::Provider {
            details: "no mail transport configured".to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail {
            display_name: "Caby".to_string(),
            from: "info@caby.ch".to_string(),
            to: to.to_string(),
            subject: "test mail from dev stage".to_string(),
            body: "this is a test".to_string(),
        }
    }

    #[test]
    fn builds_plain_text_message() {
        let message = mail("driver@example.ch").to_message().expect("message");
        let raw = String::from_utf8(message.formatted()).expect("utf8");

        assert!(raw.contains("From: Caby <info@caby.ch>"));
        assert!(raw.contains("To: driver@example.ch"));
        assert!(raw.contains("Subject: test mail from dev stage"));
        assert!(raw.contains("this is a test"));
    }

    #[test]
    fn rejects_bad_recipient() {
        assert!(matches!(
            mail("not an address").to_message(),
            Err(MailError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn smtp_provider_builds_without_connecting() {
        let settings = SmtpSettings {
            host: "email-smtp.eu-central-1.amazonaws.com".to_string(),
            port: default_smtp_port(),
            username: "user".to_string(),
            password: "secret".to_string(),
        };
        assert!(SmtpProvider::new(&settings).is_ok());
    }

    #[tokio::test]
    async fn disabled_provider_refuses() {
        assert!(DisabledProvider.send(&mail("a@b.ch")).await.is_err());
    }
}
