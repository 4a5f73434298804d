//! Session token issue/verify.
//!
//! Tokens are HS256 JWTs with fixed issuer/audience claims. `verify` treats
//! an invalid token as expected input: it returns `None` rather than an
//! error, and callers translate that into a generic 401 without revealing
//! which check failed.

use crate::error::{AppError, ConfigError};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const TOKEN_ISSUER: &str = "agency-core";
pub const TOKEN_AUDIENCE: &str = "agency-api";

/// Secrets shorter than this refuse to boot. 32 bytes matches the HS256
/// hash width.
pub const MIN_SECRET_BYTES: usize = 32;

/// Identity bound into a token at issue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: i64,
    pub email: String,
    pub agency_id: Option<i64>,
    /// Physical database the session routes to; the source of truth for the
    /// request's tenant scope for the whole validity window.
    pub agency_database: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub email: String,
    #[serde(rename = "agencyId", skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<i64>,
    #[serde(rename = "agencyDatabase", skip_serializing_if = "Option::is_none")]
    pub agency_database: Option<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Fails closed: a missing or short secret is a startup error, never a
    /// silently-insecure codec.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, ConfigError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret {
                got: secret.len(),
                min: MIN_SECRET_BYTES,
            });
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.leeway = 0;
        Ok(TokenCodec {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    /// Issue a signed token for `identity`, expiring after the configured
    /// TTL.
    pub fn issue(&self, identity: &SessionIdentity) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: identity.user_id,
            email: identity.email.clone(),
            agency_id: identity.agency_id,
            agency_database: identity.agency_database.clone(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::BadRequest(format!("token encoding failed: {}", e)))
    }

    /// Validate signature, issuer, audience and expiry in one step. Returns
    /// the claims on success, `None` on any failure, including a
    /// syntactically valid token missing its identity fields.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let data = match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(error = %e, "token verification failed");
                return None;
            }
        };
        let claims = data.claims;
        if claims.user_id <= 0 || claims.email.trim().is_empty() {
            tracing::debug!("token missing identity fields");
            return None;
        }
        Some(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, Duration::hours(1)).unwrap()
    }

    fn identity() -> SessionIdentity {
        SessionIdentity {
            user_id: 42,
            email: "ops@acme.test".into(),
            agency_id: Some(7),
            agency_database: Some("acme_db".into()),
        }
    }

    #[test]
    fn weak_secret_refuses_to_construct() {
        assert!(matches!(
            TokenCodec::new("short", Duration::hours(1)),
            Err(ConfigError::WeakSecret { .. })
        ));
        assert!(matches!(
            TokenCodec::new("", Duration::hours(1)),
            Err(ConfigError::WeakSecret { .. })
        ));
    }

    #[test]
    fn issue_then_verify_round_trips_payload() {
        let codec = codec();
        let token = codec.issue(&identity()).unwrap();
        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "ops@acme.test");
        assert_eq!(claims.agency_id, Some(7));
        assert_eq!(claims.agency_database.as_deref(), Some("acme_db"));
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.aud, TOKEN_AUDIENCE);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_signature_fails() {
        let codec = codec();
        let mut token = codec.issue(&identity()).unwrap();
        // Flip the final signature character.
        let last = token.pop().unwrap();
        token.push(if last == 'A' { 'B' } else { 'A' });
        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn expired_token_fails_despite_valid_signature() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: 42,
            email: "ops@acme.test".into(),
            agency_id: None,
            agency_database: None,
            iss: TOKEN_ISSUER.into(),
            aud: TOKEN_AUDIENCE.into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn wrong_algorithm_is_rejected() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: 42,
            email: "ops@acme.test".into(),
            agency_id: None,
            agency_database: None,
            iss: TOKEN_ISSUER.into(),
            aud: TOKEN_AUDIENCE.into(),
            iat: now,
            exp: now + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn incomplete_payload_is_invalid() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: 42,
            email: "   ".into(),
            agency_id: None,
            agency_database: None,
            iss: TOKEN_ISSUER.into(),
            aud: TOKEN_AUDIENCE.into(),
            iat: now,
            exp: now + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(codec.verify(&token).is_none());
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: 42,
            email: "ops@acme.test".into(),
            agency_id: None,
            agency_database: None,
            iss: TOKEN_ISSUER.into(),
            aud: "somewhere-else".into(),
            iat: now,
            exp: now + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(codec.verify(&token).is_none());
    }
}
