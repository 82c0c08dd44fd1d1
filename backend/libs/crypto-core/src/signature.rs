/// Signed playback token codec
///
/// Encrypts a small record (media source, optional item, expiry) into an
/// opaque token that is embedded as the `signature` query parameter of a
/// redirect URL. The storage backend decodes the same token with the same
/// shared secret before serving bytes.
///
/// ## Wire Format
///
/// `base64url_nopad( nonce (12 bytes) || AES-256-GCM(json payload) || tag (16 bytes) )`
///
/// The cipher key is SHA-256 of the shared secret. A fresh random nonce is
/// drawn per token, so minting the same record twice yields different tokens.
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::{key_fingerprint, sha256};
use crate::{CryptoError, Result};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Decoded token contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedToken {
    pub media_source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// Unix seconds
    pub expire_at: i64,
}

impl SignedToken {
    /// A token is usable strictly before its expiry second.
    pub fn is_valid_at(&self, now_unix: i64) -> bool {
        self.expire_at > now_unix
    }

    /// Seconds of lifetime left at `now_unix`, zero once expired.
    pub fn remaining_secs(&self, now_unix: i64) -> i64 {
        (self.expire_at - now_unix).max(0)
    }
}

/// Symmetric codec keyed by the process-wide shared secret
#[derive(Clone)]
pub struct SignatureCodec {
    cipher: Aes256Gcm,
    fingerprint: String,
}

impl SignatureCodec {
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(CryptoError::EmptySecret);
        }

        let key_bytes = sha256(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);

        Ok(Self {
            cipher: Aes256Gcm::new(key),
            fingerprint: key_fingerprint(secret.as_bytes()),
        })
    }

    /// Loggable identifier of the key in use
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Mint a token for `media_source_id` (and optionally `item_id`) valid until `expire_at`.
    pub fn encrypt(
        &self,
        item_id: Option<&str>,
        media_source_id: &str,
        expire_at: i64,
    ) -> Result<String> {
        let token = SignedToken {
            media_source_id: media_source_id.to_string(),
            item_id: item_id.map(str::to_string),
            expire_at,
        };
        self.encode(&token)
    }

    pub fn encode(&self, token: &SignedToken) -> Result<String> {
        let plaintext =
            serde_json::to_vec(token).map_err(|e| CryptoError::Payload(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| CryptoError::Encryption(format!("AES-GCM failed: {}", e)))?;

        let mut raw = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        raw.extend_from_slice(&nonce_bytes);
        raw.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Decode and authenticate a token. Does not check expiry.
    pub fn decrypt(&self, token: &str) -> Result<SignedToken> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;

        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Decryption("token too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| CryptoError::Decryption(format!("AES-GCM failed: {}", e)))?;

        serde_json::from_slice(&plaintext).map_err(|e| CryptoError::Payload(e.to_string()))
    }

    /// Decode `token` and check it is unexpired at `now_unix`.
    pub fn validate(&self, token: &str, now_unix: i64) -> Result<SignedToken> {
        let decoded = self.decrypt(token)?;
        if !decoded.is_valid_at(now_unix) {
            tracing::debug!(
                expire_at = decoded.expire_at,
                now = now_unix,
                "signed token expired"
            );
            return Err(CryptoError::Expired {
                expire_at: decoded.expire_at,
            });
        }
        Ok(decoded)
    }
}

/// Mints and checks playback tokens
pub trait TokenCodec: Send + Sync {
    fn encrypt(
        &self,
        item_id: Option<&str>,
        media_source_id: &str,
        expire_at: i64,
    ) -> Result<String>;

    fn validate(&self, token: &str, now_unix: i64) -> Result<SignedToken>;
}

impl TokenCodec for SignatureCodec {
    fn encrypt(
        &self,
        item_id: Option<&str>,
        media_source_id: &str,
        expire_at: i64,
    ) -> Result<String> {
        SignatureCodec::encrypt(self, item_id, media_source_id, expire_at)
    }

    fn validate(&self, token: &str, now_unix: i64) -> Result<SignedToken> {
        SignatureCodec::validate(self, token, now_unix)
    }
}

impl fmt::Debug for SignatureCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureCodec")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}
