//! Session token issuance and validation
//!
//! Tokens are HS256 JWTs carrying the user id as `sub`. They are not stored
//! anywhere; a token is valid as long as its signature and expiry check out.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    /// Parse the subject back into a user id
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).context("Subject is not a user id")
    }
}

/// Pre-computed JWT keys, derived once from the signing secret
#[derive(Clone)]
struct TokenKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl TokenKeys {
    fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: Arc::new(EncodingKey::from_secret(bytes)),
            decoding: Arc::new(DecodingKey::from_secret(bytes)),
        }
    }
}

/// Signs and validates session tokens
///
/// Build once at startup and keep in `AppState`; clones share the keys.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: TokenKeys,
    expiry_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &SecretString, expiry_secs: i64) -> Self {
        Self {
            keys: TokenKeys::new(secret),
            expiry_secs,
        }
    }

    /// Issue a token for a user, expiring `expiry_secs` from now
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiry_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|e| anyhow::anyhow!("Failed to sign token: {}", e))
    }

    /// Validate a token's signature and expiry and return its claims
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.keys.decoding, &Validation::default())
            .map_err(|e| anyhow::anyhow!("Invalid token: {}", e))?;

        Ok(token_data.claims)
    }

    #[inline]
    pub fn expiry_secs(&self) -> i64 {
        self.expiry_secs
    }
}
