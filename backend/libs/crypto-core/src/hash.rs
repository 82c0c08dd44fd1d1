use sha2::{Digest, Sha256};

/// Compute SHA256 hash of input bytes
pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Short, non-reversible identifier for a secret, safe to log.
///
/// Hashes twice so the value never equals the derived cipher key.
pub fn key_fingerprint(secret: &[u8]) -> String {
    let derived = sha256(secret);
    hex::encode(&sha256(&derived)[..4])
}
