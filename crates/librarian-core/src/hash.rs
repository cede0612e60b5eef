use sha2::{Digest, Sha256};

/// Compute the hex-encoded SHA-256 digest of raw file bytes.
///
/// This digest is the canonical cache key for incremental indexing: a file
/// whose stored hash matches is skipped without re-parsing.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
