//! The mail gate: suppression checks in front of every transactional send.

use crate::error::MailError;
use crate::provider::{MailProvider, OutgoingMail};
use crate::record::normalize_address;
use crate::store::SuppressionStore;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Display name used when none is configured.
pub const DEFAULT_DISPLAY_NAME: &str = "Caby";

/// Outcome of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub from: String,
    pub to: String,
    pub message_id: Option<String>,
}

/// Sends mail unless the recipient bounced or complained.
#[derive(Clone)]
pub struct MailGate {
    sender_domain: String,
    display_name: String,
    store: Arc<dyn SuppressionStore>,
    provider: Arc<dyn MailProvider>,
}

impl MailGate {
    pub fn new(
        sender_domain: impl Into<String>,
        store: Arc<dyn SuppressionStore>,
        provider: Arc<dyn MailProvider>,
    ) -> Self {
        Self {
            sender_domain: sender_domain.into(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            store,
            provider,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Full sender address for a local part.
    #[must_use]
    pub fn from_address(&self, from_local_part: &str) -> String {
        format!("{from_local_part}@{}", self.sender_domain)
    }

    /// Sends a plain-text mail from `<from_local_part>@<sender domain>`.
    ///
    /// The recipient is looked up in the bounce records, then the complaint
    /// records. An enabled record in either rejects the send before the
    /// provider is contacted. No retries.
    ///
    /// # Errors
    ///
    /// - [`MailError::InvalidAddress`] for a malformed sender local part or recipient
    /// - [`MailError::NotAllowed`] when the recipient is suppressed
    /// - [`MailError::Storage`] when a lookup fails
    /// - [`MailError::Provider`] when delivery fails
    #[instrument(skip_all, fields(from = %from_local_part, %to))]
    pub async fn send(
        &self,
        from_local_part: &str,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<SentMail, MailError> {
        if from_local_part.is_empty() || from_local_part.contains('@') {
            return Err(MailError::InvalidAddress {
                address: from_local_part.to_string(),
                details: "expected the local part of the sender address".to_string(),
            });
        }
        let recipient = normalize_address(to);
        if !recipient.contains('@') {
            return Err(MailError::InvalidAddress {
                address: to.to_string(),
                details: "missing '@'".to_string(),
            });
        }

        let bounce = self.store.find_bounce(&recipient).await?;
        if let Some(bounce) = bounce.filter(|b| b.enabled()) {
            warn!(kind = %bounce.kind(), "recipient suppressed by bounce");
            return Err(MailError::NotAllowed {
                email: to.to_string(),
                reason: bounce.reason(),
            });
        }
        let complaint = self.store.find_complaint(&recipient).await?;
        if let Some(complaint) = complaint.filter(|c| c.enabled()) {
            warn!(kind = %complaint.kind(), "recipient suppressed by complaint");
            return Err(MailError::NotAllowed {
                email: to.to_string(),
                reason: complaint.reason(),
            });
        }

        let mail = OutgoingMail {
            display_name: self.display_name.clone(),
            from: self.from_address(from_local_part),
            to: to.trim().to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };

        info!(from = %mail.from, subject, "sending mail");
        let message_id = self
            .provider
            .send(&mail)
            .await
            .map_err(|report| MailError::Provider {
                details: report.to_string(),
            })?;
        if let Some(id) = &message_id {
            info!(message_id = %id, "mail sent");
        }

        Ok(SentMail {
            from: mail.from,
            to: mail.to,
            message_id,
        })
    }
}
