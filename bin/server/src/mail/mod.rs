//! Mail routes and the PostgreSQL suppression store.

pub mod db;
pub mod routes;

pub use db::PgSuppressionStore;
pub use routes::{WEBHOOK_TOKEN_HEADER, bounce_webhook, complaint_webhook, send_test_mail};
