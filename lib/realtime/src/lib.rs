//! Realtime transport support for caby.
//!
//! - [`TopicPrefix`] and the [`RealtimeEvent`] catalogue name the topics
//! - [`TokenVerifier`] checks bearer tokens
//! - [`TopicAuthorizer`] turns a verified token into topic allow-lists
//! - [`RealtimePublisher`] pushes events onto the bus (NATS in production)

pub mod authorizer;
pub mod error;
pub mod publisher;
pub mod token;
pub mod topic;

pub use authorizer::{TopicAuthorizer, TopicGrant};
pub use error::RealtimeError;
pub use publisher::{NatsPublisher, RealtimePublisher, publish_event, subject_for};
pub use token::{TokenClaims, TokenVerifier};
pub use topic::{RealtimeEvent, SystemNotification, TopicPrefix, publish_topics, subscribe_topics};
