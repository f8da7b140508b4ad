//! User domain type.
//!
//! Users are provisioned by the identity provider's sign-up hook and shared
//! with this service through the database; the auth-code exchange only ever
//! looks them up.

use caby_core::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered driver or business owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    email: String,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user with a generated ID.
    #[must_use]
    pub fn new(name: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name,
            email,
            email_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes a user from storage.
    #[must_use]
    pub fn with_all_fields(
        id: UserId,
        name: String,
        email: String,
        email_verified: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            email_verified,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Marks the email address as verified.
    pub fn verify_email(&mut self) {
        self.email_verified = true;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_unverified() {
        let user = User::new("Alice".to_string(), "alice@example.ch".to_string());
        assert!(user.id().to_string().starts_with("usr_"));
        assert!(!user.email_verified());
        assert_eq!(user.created_at(), user.updated_at());
    }

    #[test]
    fn verify_email_updates_timestamp() {
        let mut user = User::new("Alice".to_string(), "alice@example.ch".to_string());
        let original = user.updated_at();
        std::thread::sleep(std::time::Duration::from_millis(1));

        user.verify_email();

        assert!(user.email_verified());
        assert!(user.updated_at() > original);
    }
}
