//! Ed25519 signing and verification for vote messages.
//!
//! Votes travel with their signature as a raw byte string, so the wire-side
//! helpers ([`sign_to_vec`], [`verify_signature_bytes`]) convert between the
//! fixed-size [`Signature`] and untrusted variable-length bytes; a
//! wrong-length byte string is simply an invalid signature, never a panic.

use accord_types::{PrivateKey, PublicKey, Signature};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

/// Sign a message with a private key, returning the signature.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    let sig = signing_key.sign(message);
    Signature(sig.to_bytes())
}

/// Sign a message and return the signature as wire bytes.
pub fn sign_to_vec(message: &[u8], private_key: &PrivateKey) -> Vec<u8> {
    sign_message(message, private_key).to_vec()
}

/// Verify a signature against a message and public key.
///
/// Returns `true` if the signature is valid, `false` otherwise.
/// Also rejects non-canonical signatures (malleability protection).
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(message, &dalek_sig).is_ok()
}

/// Verify a signature delivered as untrusted wire bytes.
pub fn verify_signature_bytes(message: &[u8], signature: &[u8], public_key: &PublicKey) -> bool {
    match Signature::from_slice(signature) {
        Some(sig) => verify_signature(message, &sig, public_key),
        None => false,
    }
}
