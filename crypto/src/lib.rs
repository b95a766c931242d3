//! Cryptographic primitives for the Accord agreement layer.
//!
//! - **Ed25519** for vote signing and signature verification
//! - **SHA-256 / double SHA-256** for block hashes and round sort values
//! - Address derivation with `acd_` prefix and hex encoding

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{derive_address, validate_address};
pub use hash::{sha256, sha256d, sha256d_multi};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, sign_to_vec, verify_signature, verify_signature_bytes};
