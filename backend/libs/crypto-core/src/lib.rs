//! Shared crypto primitives for the gateway and its storage backends.
//!
//! - [`signature`]: the signed playback token carried in redirect URLs
//! - [`hash`]: SHA-256 helpers used for key derivation and key fingerprints

pub mod hash;
pub mod signature;

pub use signature::{SignatureCodec, SignedToken, TokenCodec};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("signing secret must not be empty")]
    EmptySecret,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Authentic token past its expiry
    #[error("token expired at {expire_at}")]
    Expired { expire_at: i64 },

    #[error("token is not valid base64url: {0}")]
    Encoding(String),

    #[error("token payload is malformed: {0}")]
    Payload(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
