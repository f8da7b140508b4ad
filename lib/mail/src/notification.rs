//! Ingestion of bounce and complaint delivery notifications.
//!
//! The mail provider reports bounces and complaints through SNS. Bodies are
//! accepted as a Lambda-style envelope (`{"Records":[{"Sns":{"Message":..}}]}`),
//! an SNS HTTP notification (`{"Type":"Notification","Message":..}`), or the
//! bare provider message.

use crate::error::MailError;
use crate::record::{BounceRecord, ComplaintRecord};
use crate::store::SuppressionStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Debug, Deserialize)]
struct LambdaEnvelope {
    #[serde(rename = "Records")]
    records: Vec<LambdaRecord>,
}

#[derive(Debug, Deserialize)]
struct LambdaRecord {
    #[serde(rename = "Sns")]
    sns: SnsMessage,
}

#[derive(Debug, Deserialize)]
struct SnsMessage {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recipient {
    email_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bounce {
    bounce_type: String,
    #[serde(default)]
    bounce_sub_type: String,
    bounced_recipients: Vec<Recipient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Complaint {
    complained_recipients: Vec<Recipient>,
    #[serde(default, alias = "complaintType")]
    complaint_feedback_type: Option<String>,
    #[serde(default)]
    feedback_id: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct BounceNotification {
    bounce: Option<Bounce>,
}

#[derive(Debug, Deserialize)]
struct ComplaintNotification {
    complaint: Option<Complaint>,
}

/// Extracts the provider messages carried by a webhook body.
///
/// # Errors
///
/// Returns [`MailError::InvalidNotification`] if an embedded message is not JSON.
pub fn provider_messages(body: &Value) -> Result<Vec<Value>, MailError> {
    if body.get("Records").is_some() {
        let envelope: LambdaEnvelope = serde_json::from_value(body.clone())
            .map_err(|e| MailError::invalid_notification(format!("bad envelope: {e}")))?;
        return envelope
            .records
            .iter()
            .map(|record| parse_message(&record.sns.message))
            .collect();
    }

    if let Some(message) = body.get("Message").and_then(Value::as_str) {
        return Ok(vec![parse_message(message)?]);
    }

    Ok(vec![body.clone()])
}

fn parse_message(raw: &str) -> Result<Value, MailError> {
    serde_json::from_str(raw)
        .map_err(|e| MailError::invalid_notification(format!("message is not JSON: {e}")))
}

/// Counts of records written by one ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// New records stored.
    pub created: usize,
    /// Recipients that already had a record.
    pub existing: usize,
}

/// Turns delivery notifications into suppression records.
#[derive(Clone)]
pub struct NotificationIngestor {
    store: Arc<dyn SuppressionStore>,
}

impl NotificationIngestor {
    pub fn new(store: Arc<dyn SuppressionStore>) -> Self {
        Self { store }
    }

    /// Stores a bounce record for every bounced recipient without one.
    ///
    /// Unknown bounce types are stored as undetermined, keeping the raw
    /// values. Messages that carry no bounce are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is malformed or the store fails.
    #[instrument(skip_all)]
    pub async fn ingest_bounces(&self, body: &Value) -> Result<IngestSummary, MailError> {
        let mut summary = IngestSummary::default();

        for message in provider_messages(body)? {
            let notification: BounceNotification = serde_json::from_value(message)
                .map_err(|e| MailError::invalid_notification(format!("bad bounce: {e}")))?;
            let Some(bounce) = notification.bounce else {
                debug!("message carries no bounce");
                continue;
            };

            for recipient in &bounce.bounced_recipients {
                if self
                    .store
                    .find_bounce(&recipient.email_address)
                    .await?
                    .is_some()
                {
                    summary.existing += 1;
                    continue;
                }
                let record = BounceRecord::new(
                    &recipient.email_address,
                    &bounce.bounce_type,
                    &bounce.bounce_sub_type,
                );
                info!(email = %record.email(), kind = %record.kind(), "recording bounce");
                self.store.insert_bounce(&record).await?;
                summary.created += 1;
            }
        }

        Ok(summary)
    }

    /// Stores a complaint record for every complained recipient without one.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is malformed or the store fails.
    #[instrument(skip_all)]
    pub async fn ingest_complaints(&self, body: &Value) -> Result<IngestSummary, MailError> {
        let mut summary = IngestSummary::default();

        for message in provider_messages(body)? {
            let notification: ComplaintNotification = serde_json::from_value(message)
                .map_err(|e| MailError::invalid_notification(format!("bad complaint: {e}")))?;
            let Some(complaint) = notification.complaint else {
                debug!("message carries no complaint");
                continue;
            };

            for recipient in &complaint.complained_recipients {
                if self
                    .store
                    .find_complaint(&recipient.email_address)
                    .await?
                    .is_some()
                {
                    summary.existing += 1;
                    continue;
                }
                let record = ComplaintRecord::new(
                    &complaint.feedback_id,
                    &recipient.email_address,
                    complaint.complaint_feedback_type.as_deref(),
                    complaint.timestamp,
                );
                info!(email = %record.email(), kind = %record.kind(), "recording complaint");
                self.store.insert_complaint(&record).await?;
                summary.created += 1;
            }
        }

        Ok(summary)
    }
}
