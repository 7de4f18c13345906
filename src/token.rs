//! Stateless session tokens.
//!
//! HS256-signed JWTs carrying a snapshot of the user's identity at issuance
//! time. There is no server-side blacklist; expiry is the only termination
//! mechanism, and claims are not re-derived when the profile changes later.

use crate::db::{User, now_timestamp};
use crate::error::{AppError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Identity claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (matches `users.id`).
    pub sub: i64,
    /// Email at issuance time.
    pub email: String,
    /// Username at issuance time.
    pub username: String,
    /// Nickname at issuance time.
    pub nickname: String,
    /// Bio at issuance time.
    pub bio: String,
    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds).
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Issues and verifies signed session tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    validity_days: u32,
}

impl TokenService {
    /// Create a token service. The signing secret comes from configuration,
    /// never read ad hoc.
    pub fn new(secret: &str, validity_days: u32) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            validity_days,
        }
    }

    /// Issue a token carrying the user's identity claims.
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = now_timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            nickname: user.nickname.clone(),
            bio: user.bio.clone(),
            iat: now,
            exp: now + self.validity_days as i64 * 24 * 60 * 60,
        };

        let header = Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };

        let header_json = serde_json::to_vec(&header)
            .map_err(|e| AppError::Internal(format!("Failed to serialize token header: {}", e)))?;
        let claims_json = serde_json::to_vec(&claims)
            .map_err(|e| AppError::Internal(format!("Failed to serialize token claims: {}", e)))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&header_json),
            URL_SAFE_NO_PAD.encode(&claims_json)
        );

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("Invalid signing key: {}", e)))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Verify a token's structure, signature and expiry, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let invalid = || AppError::Unauthorized("Invalid or expired token".to_string());

        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or_else(invalid)?;
        let claims_b64 = parts.next().ok_or_else(invalid)?;
        let sig_b64 = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let header_raw = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| invalid())?;
        let header: Header = serde_json::from_slice(&header_raw).map_err(|_| invalid())?;
        if header.alg != "HS256" || header.typ != "JWT" {
            return Err(invalid());
        }

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("Invalid signing key: {}", e)))?;
        mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());
        let signature = URL_SAFE_NO_PAD.decode(sig_b64).map_err(|_| invalid())?;
        mac.verify_slice(&signature).map_err(|_| invalid())?;

        let claims_raw = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| invalid())?;
        let claims: Claims = serde_json::from_slice(&claims_raw).map_err(|_| invalid())?;

        if claims.exp <= now_timestamp() {
            return Err(invalid());
        }

        Ok(claims)
    }
}
