//! Bearer-token contract between taskcast-authd (issuer) and taskcastd
//! (verifier).
//!
//! The two services are deployed independently and share no state. Their
//! only trust relationship is this codec: given the same secret and
//! algorithm name, one side produces a signed claims payload and the other
//! verifies it. Keeping the codec in its own crate makes that contract
//! explicit — neither service links against the other.
//!
//! Tokens carry `{sub, email, provider, exp}` and nothing else. There are
//! no audience or issuer checks; expiry is validated with zero leeway so a
//! token is invalid the second its TTL elapses.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use jsonwebtoken::Algorithm;

/// Decoded, verified payload of a bearer token. Valid only for the current
/// request — never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the username that authenticated with the issuer.
    pub sub: String,
    #[serde(default)]
    pub email: String,
    /// Issuing-provider tag (e.g. "local"). Informational.
    pub provider: String,
    /// Expiry as a unix timestamp (seconds).
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed token")]
    Malformed,
    #[error("bad token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Parse an algorithm name like `"HS256"` from configuration.
pub fn parse_algorithm(name: &str) -> Option<Algorithm> {
    name.parse().ok()
}

/// Produce a signed token for `subject`, expiring `ttl` from now.
pub fn issue(
    subject: &str,
    email: &str,
    provider: &str,
    secret: &[u8],
    algorithm: Algorithm,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: subject.to_string(),
        email: email.to_string(),
        provider: provider.to_string(),
        exp: (Utc::now() + ttl).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::new(algorithm),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

/// Verify signature and expiry, returning the claims payload.
///
/// Pure function of its inputs plus the current time.
pub fn decode(token: &str, secret: &[u8], algorithm: Algorithm) -> Result<Claims, DecodeError> {
    let mut validation = Validation::new(algorithm);
    validation.leeway = 0;
    match jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => Err(match e.kind() {
            ErrorKind::ExpiredSignature => DecodeError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => DecodeError::BadSignature,
            _ => DecodeError::Malformed,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn test_issue_decode_roundtrip() {
        let token = issue(
            "alice",
            "alice@example.com",
            "local",
            SECRET,
            Algorithm::HS256,
            Duration::hours(12),
        )
        .unwrap();
        let claims = decode(&token, SECRET, Algorithm::HS256).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.provider, "local");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue(
            "alice",
            "",
            "local",
            SECRET,
            Algorithm::HS256,
            Duration::seconds(-5),
        )
        .unwrap();
        assert_eq!(
            decode(&token, SECRET, Algorithm::HS256),
            Err(DecodeError::Expired)
        );
    }

    #[test]
    fn test_wrong_secret_is_bad_signature() {
        let token = issue("alice", "", "local", SECRET, Algorithm::HS256, Duration::hours(1))
            .unwrap();
        assert_eq!(
            decode(&token, b"other-secret", Algorithm::HS256),
            Err(DecodeError::BadSignature)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(
            decode("not-a-token", SECRET, Algorithm::HS256),
            Err(DecodeError::Malformed)
        );
        assert_eq!(
            decode("a.b.c", SECRET, Algorithm::HS256),
            Err(DecodeError::Malformed)
        );
    }

    #[test]
    fn test_email_can_be_empty() {
        let token = issue("bob", "", "local", SECRET, Algorithm::HS256, Duration::hours(1))
            .unwrap();
        let claims = decode(&token, SECRET, Algorithm::HS256).unwrap();
        assert_eq!(claims.email, "");
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!(parse_algorithm("HS256"), Some(Algorithm::HS256));
        assert_eq!(parse_algorithm("nope"), None);
    }
}
