use sha2::{Digest, Sha256};

/// Reserved `initial_hash` value: the caller believes the file does not exist yet.
pub const NEW_FILE_SENTINEL: &str = "new-file";

/// Content fingerprint: SHA-256 over raw bytes, lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
