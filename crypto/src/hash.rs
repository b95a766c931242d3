//! SHA-256 hashing for blocks, transactions, and round sort values.
//!
//! The round scheduler derives each member's sort value from a **double**
//! SHA-256 (`sha256d`), which resists pre-image gaming of the packing order:
//! grinding a packing address against the composed digest is strictly harder
//! than against a single round of the hash.

use sha2::{Digest, Sha256};

/// Compute a single SHA-256 hash of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute SHA-256 twice in sequence (`sha256(sha256(data))`).
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Double-SHA-256 over multiple byte slices hashed in sequence
/// (avoids concatenation allocation).
pub fn sha256d_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let first = hasher.finalize();
    sha256(&first)
}
