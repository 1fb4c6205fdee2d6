//! Access-token signing and refresh-token generation.
//!
//! Access tokens are HS256-signed JWTs; validation pins the algorithm so a
//! token declaring anything else is rejected outright. Refresh tokens are
//! opaque 256-bit random values — only their SHA-256 digest is ever handed
//! to storage.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
    errors::ErrorKind,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::types::Identity;
use crate::error::AuthError;

/// Signed claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id (UUID string).
    pub sub: String,
    /// Tenant id (UUID string).
    pub tid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Permission list resolved by the caller at issue time.
    pub perms: Vec<String>,
    /// Unique token id.
    pub jti: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenSigner {
    pub fn new(secret: &[u8], access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Issue a signed access token for the identity.
    pub fn issue_access_token(
        &self,
        identity: &Identity,
        permissions: Vec<String>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.access_ttl_secs);
        let claims = AccessClaims {
            sub: identity.id.to_string(),
            tid: identity.tenant_id.to_string(),
            email: identity.email.clone(),
            perms: permissions,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("jwt encode failure: {e}"))?;
        Ok((token, expires_at))
    }

    /// Validate a token and return its claims.
    ///
    /// Expired, not-yet-valid, wrong-algorithm, and structurally invalid
    /// tokens are distinguished as separate outcomes.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::TokenInvalid)?;
        if header.alg != Algorithm::HS256 {
            return Err(AuthError::TokenAlgorithmMismatch);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);

        let data = decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                ErrorKind::InvalidAlgorithm => AuthError::TokenAlgorithmMismatch,
                _ => AuthError::TokenInvalid,
            }
        })?;
        Ok(data.claims)
    }

    /// Generate an opaque refresh token. The raw value goes to the caller;
    /// only [`hash_refresh_token`] output may be persisted.
    pub fn issue_refresh_token(&self) -> (String, DateTime<Utc>) {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let raw = URL_SAFE_NO_PAD.encode(bytes);
        let expires_at = Utc::now() + Duration::seconds(self.refresh_ttl_secs);
        (raw, expires_at)
    }
}

/// Deterministic one-way digest of a refresh token, hex-encoded.
pub fn hash_refresh_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
