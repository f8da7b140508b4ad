//! Test-send and delivery-notification webhook routes.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use caby_mail::{IngestSummary, MailError};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, instrument, warn};

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::AppState;

const TEST_SENDER: &str = "info";
const TEST_SUBJECT: &str = "test mail from dev stage";
const TEST_BODY: &str = "this is a test";

/// Header carrying the webhook shared secret.
pub const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";

/// Body of `POST /admin/mails/test`.
#[derive(Debug, Deserialize)]
pub struct TestMailRequest {
    to: String,
}

/// Sends a fixed test mail through the mail gate.
#[instrument(skip_all)]
pub async fn send_test_mail(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
    Json(request): Json<TestMailRequest>,
) -> Result<Response, ApiError> {
    info!(user_id = %auth.user_id(), to = %request.to, "sending test mail");
    match state
        .mail
        .send(TEST_SENDER, &request.to, TEST_SUBJECT, TEST_BODY)
        .await
    {
        Ok(sent) => Ok(Json(json!({
            "sent": true,
            "message_id": sent.message_id,
        }))
        .into_response()),
        Err(e @ MailError::NotAllowed { .. }) => {
            info!(user_id = %auth.user_id(), error = %e, "test mail suppressed");
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "sent": false, "error": e.to_string() })),
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Outcome of a webhook delivery.
enum WebhookBody {
    /// A subscription handshake, acknowledged without ingesting anything.
    SubscriptionConfirmation,
    Notification(Value),
}

/// Query string of the webhook routes.
///
/// SNS HTTP subscriptions cannot set headers, so the secret may ride in the
/// subscription URL instead.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    #[serde(default)]
    token: Option<String>,
}

/// Checks the presented secret against the configured one.
///
/// Without a configured secret every delivery is refused.
fn verify_webhook_token(
    expected: Option<&str>,
    headers: &HeaderMap,
    query: &WebhookQuery,
) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        warn!("webhook rejected: no webhook token configured");
        return Err(ApiError::Unauthorized);
    };
    let presented = headers
        .get(WEBHOOK_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .or(query.token.as_deref());
    match presented {
        Some(presented) if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

fn parse_webhook(raw: &str) -> Result<WebhookBody, ApiError> {
    let body: Value = serde_json::from_str(raw).map_err(|e| ApiError::BadRequest {
        details: format!("body is not JSON: {e}"),
    })?;

    if body.get("Type").and_then(|t| t.as_str()) == Some("SubscriptionConfirmation") {
        let subscribe_url = body
            .get("SubscribeURL")
            .and_then(|u| u.as_str())
            .unwrap_or("");
        warn!(%subscribe_url, "notification subscription awaits confirmation");
        return Ok(WebhookBody::SubscriptionConfirmation);
    }

    Ok(WebhookBody::Notification(body))
}

/// Stores bounce records from a delivery notification.
///
/// Accepts any content type; SNS posts JSON as `text/plain`. The shared
/// secret is checked before the body is looked at.
pub async fn bounce_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<WebhookQuery>,
    body: String,
) -> Result<Json<IngestSummary>, ApiError> {
    verify_webhook_token(state.webhook_token.as_deref(), &headers, &query)?;
    match parse_webhook(&body)? {
        WebhookBody::SubscriptionConfirmation => Ok(Json(IngestSummary::default())),
        WebhookBody::Notification(value) => {
            let summary = state.notifications.ingest_bounces(&value).await?;
            info!(created = summary.created, existing = summary.existing, "bounces ingested");
            Ok(Json(summary))
        }
    }
}

/// Stores complaint records from a delivery notification.
pub async fn complaint_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<WebhookQuery>,
    body: String,
) -> Result<Json<IngestSummary>, ApiError> {
    verify_webhook_token(state.webhook_token.as_deref(), &headers, &query)?;
    match parse_webhook(&body)? {
        WebhookBody::SubscriptionConfirmation => Ok(Json(IngestSummary::default())),
        WebhookBody::Notification(value) => {
            let summary = state.notifications.ingest_complaints(&value).await?;
            info!(created = summary.created, existing = summary.existing, "complaints ingested");
            Ok(Json(summary))
        }
    }
}
