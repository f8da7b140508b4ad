//! caby HTTP server.
//!
//! Hosts the identity-provider callback and session routes, realtime topic
//! authorization, suppression-checked transactional mail and the delivery
//! notification webhooks. Collaborators are injected through
//! [`state::Collaborators`] so the router can run against in-memory fakes.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod mail;
pub mod realtime;
pub mod state;
