//! At-rest protection for TOTP secrets.
//!
//! AES-256-GCM with a random 12-byte nonce per encryption. The stored blob
//! is `base64(nonce || ciphertext)` — fully reconstructible from the string
//! alone. AAD binds the blob to its tenant and user so a ciphertext copied
//! onto another row fails authentication.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::Rng;
use uuid::Uuid;

use crate::error::AuthError;

/// Key length in bytes (AES-256).
pub const CIPHER_KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; CIPHER_KEY_LEN],
}

impl SecretCipher {
    pub fn new(key: [u8; CIPHER_KEY_LEN]) -> Self {
        Self { key }
    }

    /// Build from a base64-encoded 32-byte key (config form).
    pub fn from_base64(encoded: &str) -> anyhow::Result<Self> {
        let bytes = BASE64.decode(encoded)?;
        let key: [u8; CIPHER_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("cipher key must be {CIPHER_KEY_LEN} bytes"))?;
        Ok(Self::new(key))
    }

    /// Encrypt a secret, returning the self-contained base64 blob.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<String, AuthError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aad = construct_aad(tenant_id, user_id);
        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|e| anyhow::anyhow!("encryption failure: {e}"))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(
        &self,
        blob: &str,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<u8>, AuthError> {
        let data = BASE64
            .decode(blob)
            .map_err(|e| anyhow::anyhow!("invalid secret blob encoding: {e}"))?;
        if data.len() < NONCE_LEN {
            return Err(anyhow::anyhow!("secret blob too short").into());
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));

        let aad = construct_aad(tenant_id, user_id);
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|e| anyhow::anyhow!("decryption failure: {e}"))?;
        Ok(plaintext)
    }
}

fn construct_aad(tenant_id: Uuid, user_id: Uuid) -> Vec<u8> {
    format!("totp-secret:v1|{tenant_id}|{user_id}").into_bytes()
}
