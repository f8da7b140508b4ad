//! Realtime bus routes: connection authorization and notification publishing.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use caby_realtime::{
    RealtimeError, RealtimeEvent, SystemNotification, TopicGrant, publish_event,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Extracts the token from an `Authorization: Bearer` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Grants topic allow-lists to a realtime client.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TopicGrant>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| RealtimeError::invalid_token("missing bearer token"))?;
    Ok(Json(state.authorizer.authorize(token)?))
}

/// Body of `POST /admin/notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    title: String,
    message: String,
    #[serde(default)]
    link: Option<String>,
}

/// Publishes a system notification on the realtime bus.
#[instrument(skip_all)]
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
    Json(request): Json<NotificationRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest {
            details: "title must not be empty".to_string(),
        });
    }
    let publisher = state.publisher.as_ref().ok_or(ApiError::Unavailable {
        feature: "realtime publishing",
    })?;

    let notification = SystemNotification::new(request.title, request.message, request.link);
    let topic = publish_event(
        publisher.as_ref(),
        state.topic_prefix(),
        RealtimeEvent::SystemNotificationCreated,
        &notification,
    )
    .await
    .map_err(|report| RealtimeError::PublishFailed {
        details: report.to_string(),
    })?;

    info!(
        user_id = %auth.user_id(),
        notification_id = %notification.id,
        %topic,
        "system notification published"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "id": notification.id.to_string(), "topic": topic })),
    ))
}
