//! Topic authorization for connecting realtime clients.

use crate::error::RealtimeError;
use crate::token::TokenVerifier;
use crate::topic::{TopicPrefix, publish_topics, subscribe_topics};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Topic allow-lists granted to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicGrant {
    pub subscribe: Vec<String>,
    pub publish: Vec<String>,
}

/// Decides which topics a bearer token may use.
///
/// The token is verified before any topic is derived from it. A verified
/// subject additionally gets its own `user/<sub>/#` subscription.
#[derive(Debug, Clone)]
pub struct TopicAuthorizer {
    prefix: TopicPrefix,
    verifier: TokenVerifier,
}

impl TopicAuthorizer {
    #[must_use]
    pub fn new(prefix: TopicPrefix, verifier: TokenVerifier) -> Self {
        Self { prefix, verifier }
    }

    #[must_use]
    pub fn prefix(&self) -> &TopicPrefix {
        &self.prefix
    }

    /// Authorizes a connection carrying `token`.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::InvalidToken`] when the token does not verify,
    /// or when its subject cannot be used inside a topic name.
    #[instrument(skip_all, fields(prefix = %self.prefix))]
    pub fn authorize(&self, token: &str) -> Result<TopicGrant, RealtimeError> {
        let claims = self.verifier.verify(token)?;

        if claims.sub.contains(['/', '#', '+']) {
            return Err(RealtimeError::invalid_token(
                "subject contains topic wildcard or separator",
            ));
        }

        let mut subscribe = subscribe_topics(&self.prefix);
        subscribe.push(self.prefix.user_topic(&claims.sub));
        let publish = publish_topics(&self.prefix);

        debug!(sub = %claims.sub, topics = subscribe.len(), "realtime connection authorized");

        Ok(TopicGrant { subscribe, publish })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tests::{SECRET, mint};
    use chrono::Duration;

    fn authorizer() -> TopicAuthorizer {
        TopicAuthorizer::new(
            TopicPrefix::new("app", "dev"),
            TokenVerifier::new(SECRET, None, None),
        )
    }

    #[test]
    fn grants_prefixed_topics() {
        let token = mint(SECRET, "usr_42", Duration::minutes(5), None);
        let grant = authorizer().authorize(&token).expect("authorized");

        assert_eq!(authorizer().prefix().as_str(), "app/dev/");
        assert!(!grant.subscribe.is_empty());
        assert!(!grant.publish.is_empty());
        for topic in grant.subscribe.iter().chain(&grant.publish) {
            assert!(topic.starts_with("app/dev/"), "{topic}");
        }
        assert!(grant.subscribe.contains(&"app/dev/user/usr_42/#".to_string()));
        assert!(!grant.publish.iter().any(|t| t.contains("/user/")));
    }

    #[test]
    fn rejects_expired_token() {
        let token = mint(SECRET, "usr_42", Duration::hours(-2), None);
        assert!(matches!(
            authorizer().authorize(&token),
            Err(RealtimeError::InvalidToken { .. })
        ));
    }

    #[test]
    fn rejects_unsigned_presence_token() {
        assert!(authorizer().authorize("anything").is_err());
    }

    #[test]
    fn rejects_wildcard_subject() {
        let token = mint(SECRET, "usr/#", Duration::minutes(5), None);
        assert!(authorizer().authorize(&token).is_err());
    }
}
