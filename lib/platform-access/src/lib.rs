//! Platform access for caby: sessions, users and the authorization-code
//! exchange.
//!
//! This crate provides:
//! - The [`AuthCodeExchange`] that turns an identity-provider redirect into a session
//! - The [`SessionAccessor`] used by every authenticated route
//! - Storage seams ([`SessionStore`], [`AccountStore`]) and in-memory implementations
//! - Authentication error types
//!
//! # Example
//!
//! ```
//! use caby_platform_access::{AccessToken, Session, User};
//! use chrono::Duration;
//!
//! let user = User::new("Alice".to_string(), "alice@example.ch".to_string());
//! let token = AccessToken::new("eyJhbGciOi...").expect("non-empty token");
//! let session = Session::new(user.id(), token, None, Duration::days(7));
//!
//! assert!(!session.is_expired());
//! assert!(AccessToken::new("").is_err());
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod exchange;
pub mod memory;
pub mod session;
pub mod store;
pub mod user;

pub use auth::{AuthResult, AuthenticatedUser, SessionAccessor};
pub use config::{AuthCodeConfig, AuthCodeConfigBuilder, CookieLifetime, IdentitySource};
pub use error::AuthenticationError;
pub use exchange::{
    AuthCodeExchange, EstablishedSession, IdentityResolver, TokenEndpoint, TokenRequest,
    TokenResponse,
};
pub use session::{AccessToken, EmptyAccessToken, Session};
pub use store::{AccountStore, SessionStore};
pub use user::User;
