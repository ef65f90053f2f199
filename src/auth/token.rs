use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

/// Claims carried by both session and one-time tokens.
///
/// One-time (invite/reset) tokens are distinguished by the `jti` nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_one_time(&self) -> bool {
        self.jti.is_some()
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token signing secret is not configured")]
    MissingSecret,

    #[error("Token generation failed: {0}")]
    Signing(String),

    /// Bad signature, malformed token and expiry all collapse here.
    #[error("Invalid or expired token")]
    Invalid,
}

/// Issues and verifies HS256 tokens. Verification never touches the database.
#[derive(Clone)]
pub struct TokenService {
    secret: Arc<str>,
    session_ttl: Duration,
    one_time_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("session_ttl", &self.session_ttl)
            .field("one_time_ttl", &self.one_time_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: impl Into<String>, session_ttl: Duration, one_time_ttl: Duration) -> Self {
        Self {
            secret: Arc::from(secret.into()),
            session_ttl,
            one_time_ttl,
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(
            security.jwt_secret.clone(),
            Duration::hours(security.session_token_ttl_hours),
            Duration::hours(security.one_time_token_ttl_hours),
        )
    }

    pub fn one_time_ttl(&self) -> Duration {
        self.one_time_ttl
    }

    pub fn issue_session_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.sign(user_id, None, self.session_ttl)
    }

    pub fn issue_one_time_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.sign(user_id, Some(Uuid::new_v4()), self.one_time_ttl)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::Invalid);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                TokenError::Invalid
            })
    }

    fn sign(&self, user_id: Uuid, jti: Option<Uuid>, ttl: Duration) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let now = Utc::now();
        let claims = Claims {
            user_id,
            jti,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

/// Lowercase SHA-256 hex digest used for persisted token lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::hours(24), Duration::hours(24))
    }

    #[test]
    fn session_token_round_trip() {
        let tokens = service();
        let user_id = Uuid::new_v4();

        let token = tokens.issue_session_token(user_id).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert!(!claims.is_one_time());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn one_time_tokens_carry_a_fresh_nonce() {
        let tokens = service();
        let user_id = Uuid::new_v4();

        let first = tokens.verify(&tokens.issue_one_time_token(user_id).unwrap()).unwrap();
        let second = tokens.verify(&tokens.issue_one_time_token(user_id).unwrap()).unwrap();

        assert!(first.is_one_time());
        assert_eq!(first.user_id, user_id);
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn expired_token_is_invalid() {
        let tokens = TokenService::new("test-secret", Duration::hours(-1), Duration::hours(-1));
        let token = tokens.issue_session_token(Uuid::new_v4()).unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn wrong_secret_and_garbage_are_reported_identically() {
        let token = service().issue_session_token(Uuid::new_v4()).unwrap();
        let other = TokenService::new("other-secret", Duration::hours(1), Duration::hours(1));

        assert!(matches!(other.verify(&token), Err(TokenError::Invalid)));
        assert!(matches!(other.verify("not.a.jwt"), Err(TokenError::Invalid)));
        assert!(matches!(other.verify(""), Err(TokenError::Invalid)));
    }

    #[test]
    fn missing_secret_fails_issuance() {
        let tokens = TokenService::new("", Duration::hours(1), Duration::hours(1));
        assert!(matches!(
            tokens.issue_session_token(Uuid::new_v4()),
            Err(TokenError::MissingSecret)
        ));
    }

    #[test]
    fn hash_is_deterministic_and_distinguishes_inputs() {
        let a = hash_token("token-a");
        assert_eq!(a, hash_token("token-a"));
        assert_ne!(a, hash_token("token-b"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
