//! Deployment-scoped topic names and the realtime event catalogue.
//!
//! Every topic has the form `<app>/<stage>/<suffix>`. The prefix is computed
//! from the deployment identity and never persisted.

use caby_core::NotificationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The `<app>/<stage>/` prefix shared by all topics of one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPrefix(String);

impl TopicPrefix {
    /// Builds the prefix for an application name and stage.
    #[must_use]
    pub fn new(app: &str, stage: &str) -> Self {
        Self(format!("{app}/{stage}/"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends `suffix` to the prefix.
    #[must_use]
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.0)
    }

    /// Topic for an event of the catalogue.
    #[must_use]
    pub fn event_topic(&self, event: RealtimeEvent) -> String {
        self.topic(event.name())
    }

    /// Wildcard topic scoped to one verified identity.
    #[must_use]
    pub fn user_topic(&self, subject: &str) -> String {
        self.topic(&format!("user/{subject}/#"))
    }
}

impl fmt::Display for TopicPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Events clients may exchange over the realtime transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RealtimeEvent {
    PaymentSent,
    PaymentReceived,
    RideCreated,
    SystemNotificationCreated,
}

impl RealtimeEvent {
    /// All catalogued events, in publication order.
    pub const ALL: [RealtimeEvent; 4] = [
        Self::PaymentSent,
        Self::PaymentReceived,
        Self::RideCreated,
        Self::SystemNotificationCreated,
    ];

    /// Wire name of the event.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PaymentSent => "payment.sent",
            Self::PaymentReceived => "payment.received",
            Self::RideCreated => "ride.created",
            Self::SystemNotificationCreated => "systemnotification.created",
        }
    }
}

impl fmt::Display for RealtimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Topics a connecting client may subscribe to.
#[must_use]
pub fn subscribe_topics(prefix: &TopicPrefix) -> Vec<String> {
    RealtimeEvent::ALL
        .iter()
        .map(|event| prefix.event_topic(*event))
        .collect()
}

/// Topics a connecting client may publish to.
#[must_use]
pub fn publish_topics(prefix: &TopicPrefix) -> Vec<String> {
    RealtimeEvent::ALL
        .iter()
        .map(|event| prefix.event_topic(*event))
        .collect()
}

/// Payload of a `systemnotification.created` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemNotification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SystemNotification {
    /// Creates a notification stamped with the current time.
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>, link: Option<String>) -> Self {
        Self {
            id: NotificationId::new(),
            title: title.into(),
            message: message.into(),
            link,
            created_at: Utc::now(),
        }
    }
}
