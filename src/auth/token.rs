use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Result, TrickleError};

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Expiration time (as UTC timestamp)
    pub exp: u64,
    /// Issued at (as UTC timestamp)
    pub iat: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Claims {
    /// Creates claims for an account, valid for `ttl` from now
    pub fn new(account_id: String, ttl: Duration) -> Self {
        let now = now_secs();
        Self {
            sub: account_id,
            exp: now + ttl.as_secs(),
            iat: now,
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        now_secs() >= self.exp
    }
}

/// Issues and verifies HS256 session tokens
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenManager {
    /// Creates a new token manager with a secret
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is an absolute instant
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Generates a JWT token for the given claims
    pub fn generate_token(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TrickleError::AuthError(format!("Failed to generate token: {}", e)))
    }

    /// Mint a session token for an account
    pub fn issue(&self, account_id: &str) -> Result<String> {
        self.generate_token(&Claims::new(account_id.to_string(), self.ttl))
    }

    /// Validates a token and returns the account ID it was issued for
    pub fn verify(&self, token: &str) -> Result<String> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TrickleError::TokenExpired,
                _ => TrickleError::AuthError(format!("Invalid token: {}", e)),
            }
        })?;

        if data.claims.is_expired() {
            return Err(TrickleError::TokenExpired);
        }
        if data.claims.sub.is_empty() {
            return Err(TrickleError::AuthError("Invalid token claims".to_string()));
        }

        Ok(data.claims.sub)
    }
}
