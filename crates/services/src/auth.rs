//! Bearer tokens and password hashing.
//!
//! A token is `base64url(claims) "." base64url(HMAC-SHA256(claims))`, where
//! the claims are `{"sub": <user id>, "exp": <unix seconds>}`.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use common::UserId;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Result, ServiceError};

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub exp: i64,
}

/// Issues and verifies signed bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
    ttl: Duration,
}

impl TokenSigner {
    /// Creates a signer with the given HMAC secret and token lifetime.
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Returns the configured token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for a user, valid from now.
    pub fn issue(&self, user_id: UserId) -> Result<String> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issues a token as if the current time were `now`.
    pub fn issue_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: user_id,
            exp: (now + self.ttl).timestamp(),
        };
        let claims = serde_json::to_vec(&claims)
            .map_err(|e| ServiceError::Internal(format!("Failed to encode token claims: {e}")))?;
        let payload = URL_SAFE_NO_PAD.encode(claims);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Verifies a token's signature and expiry, returning its subject.
    pub fn verify(&self, token: &str) -> Result<UserId> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a token as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId> {
        let (payload, signature) = token.split_once('.').ok_or_else(invalid_token)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| invalid_token())?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        // Constant-time comparison
        mac.verify_slice(&signature).map_err(|_| invalid_token())?;

        let claims: Claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(invalid_token)?;

        if claims.exp <= now.timestamp() {
            return Err(ServiceError::Unauthenticated(
                "Not authorized, token expired".to_string(),
            ));
        }

        Ok(claims.sub)
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| ServiceError::Internal(format!("Invalid token key: {e}")))
    }
}

fn invalid_token() -> ServiceError {
    ServiceError::Unauthenticated("Not authorized, token failed".to_string())
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
