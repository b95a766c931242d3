//! Address derivation from public keys.
//!
//! Address format: `acd_` + hex(first 20 bytes of sha256d(public_key))
//! + hex(4-byte checksum).
//!
//! Checksum: first 4 bytes of sha256d over the 20-byte body. Total address
//! length: 4 (prefix) + 40 + 8 = 52 characters.

use accord_types::{Address, PublicKey};

use crate::hash::sha256d;

/// Number of body bytes taken from the hashed public key.
const BODY_LEN: usize = 20;
/// Number of checksum bytes appended after the body.
const CHECKSUM_LEN: usize = 4;
/// Hex characters after the `acd_` prefix.
const ENCODED_LEN: usize = (BODY_LEN + CHECKSUM_LEN) * 2;

/// Derive the Accord address for a public key.
pub fn derive_address(public_key: &PublicKey) -> Address {
    let digest = sha256d(public_key.as_bytes());
    let body = &digest[..BODY_LEN];
    let check = checksum(body);
    Address::new(format!(
        "{}{}{}",
        Address::PREFIX,
        hex::encode(body),
        hex::encode(check)
    ))
}

/// Validate an address string: prefix, length, hex body, and checksum.
pub fn validate_address(raw: &str) -> bool {
    let Some(encoded) = raw.strip_prefix(Address::PREFIX) else {
        return false;
    };
    if encoded.len() != ENCODED_LEN {
        return false;
    }
    let Ok(bytes) = hex::decode(encoded) else {
        return false;
    };
    let (body, check) = bytes.split_at(BODY_LEN);
    checksum(body) == check
}

fn checksum(body: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = sha256d(body);
    let mut check = [0u8; CHECKSUM_LEN];
    check.copy_from_slice(&digest[..CHECKSUM_LEN]);
    check
}
