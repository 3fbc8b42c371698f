//! Session token issuing and verification
//!
//! Sessions are stateless: a signed HS256 token embedding the user id, issued
//! at the end of a successful ceremony and carried in an httpOnly cookie. A
//! valid token means this process (or one sharing the signing key) minted it
//! and it has not expired; there is no server-side revocation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed session lifetime, matched by the `session` cookie max-age.
pub const SESSION_TTL_DAYS: i64 = 30;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid session")]
    InvalidSession,

    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mint a token asserting `user_id`, expiring in thirty days.
    pub fn issue(&self, user_id: &str) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Verify a token and return the user id it asserts. Fails on a bad
    /// signature, malformed payload, or expiry.
    pub fn verify(&self, token: &str) -> Result<String, SessionError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| SessionError::InvalidSession)?;

        Ok(data.claims.sub)
    }
}
