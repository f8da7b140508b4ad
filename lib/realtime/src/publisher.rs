//! Publishing events onto the realtime bus.
//!
//! Topics map onto NATS subjects by replacing `/` with `.`, so
//! `caby/prod/ride.created` is published on `caby.prod.ride.created`.

use crate::error::RealtimeError;
use crate::topic::{RealtimeEvent, TopicPrefix};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

/// Sink for realtime events.
#[async_trait]
pub trait RealtimePublisher: Send + Sync {
    /// Publishes a JSON payload on `topic`.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> caby_core::Result<(), RealtimeError>;
}

/// Serializes `payload` and publishes it as `event` under `prefix`.
///
/// # Errors
///
/// Returns an error if serialization or publishing fails.
pub async fn publish_event<P, T>(
    publisher: &P,
    prefix: &TopicPrefix,
    event: RealtimeEvent,
    payload: &T,
) -> caby_core::Result<String, RealtimeError>
where
    P: RealtimePublisher + ?Sized,
    T: Serialize + Sync,
{
    let topic = prefix.event_topic(event);
    let bytes = serde_json::to_vec(payload).map_err(|e| RealtimeError::PublishFailed {
        details: format!("failed to serialize {event} payload: {e}"),
    })?;
    publisher.publish(&topic, bytes).await?;
    Ok(topic)
}

/// Maps a topic onto its NATS subject.
#[must_use]
pub fn subject_for(topic: &str) -> String {
    topic.replace('/', ".")
}

/// NATS-backed [`RealtimePublisher`].
#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    /// Connects to the NATS server at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(url: &str) -> caby_core::Result<Self, RealtimeError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed {
                details: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RealtimePublisher for NatsPublisher {
    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> caby_core::Result<(), RealtimeError> {
        let subject = subject_for(topic);
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| RealtimeError::PublishFailed {
                details: e.to_string(),
            })?;
        self.client
            .flush()
            .await
            .map_err(|e| RealtimeError::PublishFailed {
                details: e.to_string(),
            })?;

        debug!(%subject, "event published");
        Ok(())
    }
}
