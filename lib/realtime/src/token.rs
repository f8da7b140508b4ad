//! Bearer token verification.
//!
//! Tokens are HS256 JWTs. Signature and expiry are always checked; issuer
//! and audience only when configured.

use crate::error::RealtimeError;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Claims carried by a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (the user the token was issued to).
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Verifies bearer tokens against a shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &[u8], issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Verifies `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::InvalidToken`] if the token is empty, badly
    /// signed, expired, or fails issuer/audience checks.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, RealtimeError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(RealtimeError::invalid_token("empty token"));
        }

        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            debug!(error = %e, "token rejected");
            RealtimeError::invalid_token(e.to_string())
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(RealtimeError::invalid_token("missing subject"));
        }

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.validation.iss)
            .field("audience", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    pub(crate) const SECRET: &[u8] = b"test-secret";

    pub(crate) fn mint(secret: &[u8], sub: &str, ttl: Duration, iss: Option<&str>) -> String {
        let claims = TokenClaims {
            sub: sub.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
            iss: iss.map(str::to_string),
            aud: None,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .expect("encode token")
    }

    #[test]
    fn accepts_valid_token() {
        let verifier = TokenVerifier::new(SECRET, None, None);
        let token = mint(SECRET, "usr_1", Duration::minutes(5), None);

        let claims = verifier.verify(&token).expect("valid");
        assert_eq!(claims.sub, "usr_1");
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = TokenVerifier::new(SECRET, None, None);
        let token = mint(SECRET, "usr_1", Duration::hours(-1), None);

        assert!(matches!(
            verifier.verify(&token),
            Err(RealtimeError::InvalidToken { .. })
        ));
    }

    #[test]
    fn rejects_wrong_signature() {
        let verifier = TokenVerifier::new(SECRET, None, None);
        let token = mint(b"other-secret", "usr_1", Duration::minutes(5), None);

        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn rejects_garbage_and_empty() {
        let verifier = TokenVerifier::new(SECRET, None, None);
        assert!(verifier.verify("not-a-jwt").is_err());
        assert_eq!(
            verifier.verify("  "),
            Err(RealtimeError::invalid_token("empty token"))
        );
    }

    #[test]
    fn checks_issuer_when_configured() {
        let verifier = TokenVerifier::new(SECRET, Some("https://auth.caby.ch"), None);

        let good = mint(SECRET, "usr_1", Duration::minutes(5), Some("https://auth.caby.ch"));
        let bad = mint(SECRET, "usr_1", Duration::minutes(5), Some("https://evil.example"));

        assert!(verifier.verify(&good).is_ok());
        assert!(verifier.verify(&bad).is_err());
    }
}
