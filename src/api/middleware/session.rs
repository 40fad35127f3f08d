//! Session tokens
//!
//! A viewer identity is a JWT whose subject is the viewer's id. Issued
//! at signup/login, presented as a bearer header on REST calls and as a
//! `token` query parameter on the WebSocket handshake (browsers cannot
//! set headers there).

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, TallyError};

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (viewer id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    /// Create new claims for a viewer
    pub fn new(viewer_id: Uuid, expiry_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: viewer_id.to_string(),
            exp: (now + Duration::hours(expiry_hours)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct SessionAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionAuth {
    /// Create a new session token handler
    ///
    /// An empty secret gets a secure random one; sessions then survive
    /// only as long as the process, which is fine for development.
    pub fn new(secret: &str) -> Self {
        let key = if secret.is_empty() {
            let mut key_bytes = [0u8; 32];
            OsRng
                .try_fill_bytes(&mut key_bytes)
                .expect("FATAL: Failed to generate random JWT key. System entropy may be unavailable.");

            debug!("Generated random JWT secret");
            key_bytes.to_vec()
        } else {
            secret.as_bytes().to_vec()
        };

        Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
        }
    }

    /// Issue a session token for the given viewer
    pub fn issue_token(&self, viewer_id: Uuid, expiry_hours: i64) -> Result<String> {
        let claims = Claims::new(viewer_id, expiry_hours);
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Validate a token and return the viewer id it names
    pub fn verify_token(&self, token: &str) -> Result<Uuid> {
        let claims = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Session token validation failed: {}", e);
                TallyError::AuthenticationFailed
            })?;

        Uuid::parse_str(&claims.sub).map_err(|_| TallyError::AuthenticationFailed)
    }

    /// Extract token from an Authorization header value
    pub fn extract_bearer(authorization: &str) -> Option<&str> {
        authorization.strip_prefix("Bearer ")
    }
}

/// Extractor for authenticated requests
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedViewer {
    pub viewer_id: Uuid,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedViewer
where
    S: Send + Sync,
{
    type Rejection = TallyError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(TallyError::AuthenticationFailed)?;

        let token =
            SessionAuth::extract_bearer(auth_header).ok_or(TallyError::AuthenticationFailed)?;

        // Set on every request by the router layer
        let session = parts
            .extensions
            .get::<SessionAuth>()
            .ok_or_else(|| TallyError::Internal("session auth not configured".into()))?;

        let viewer_id = session.verify_token(token)?;

        Ok(AuthenticatedViewer { viewer_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let session = SessionAuth::new("test-secret");
        let viewer_id = Uuid::new_v4();

        let token = session.issue_token(viewer_id, 24).unwrap();
        assert_eq!(session.verify_token(&token).unwrap(), viewer_id);
    }

    #[test]
    fn test_random_secret_still_verifies() {
        let session = SessionAuth::new("");
        let viewer_id = Uuid::new_v4();

        let token = session.issue_token(viewer_id, 24).unwrap();
        assert_eq!(session.verify_token(&token).unwrap(), viewer_id);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let session = SessionAuth::new("test-secret");

        let result = session.verify_token("invalid.token.here");
        assert!(matches!(result, Err(TallyError::AuthenticationFailed)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let session = SessionAuth::new("test-secret");

        // Expired an hour ago
        let token = session.issue_token(Uuid::new_v4(), -1).unwrap();
        let result = session.verify_token(&token);
        assert!(matches!(result, Err(TallyError::AuthenticationFailed)));
    }

    #[test]
    fn test_tokens_do_not_cross_secrets() {
        let issuer = SessionAuth::new("secret-a");
        let other = SessionAuth::new("secret-b");

        let token = issuer.issue_token(Uuid::new_v4(), 24).unwrap();
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(SessionAuth::extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(SessionAuth::extract_bearer("abc123"), None);
    }
}
