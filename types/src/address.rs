//! Account address type with `acd_` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An Accord account address, always prefixed with `acd_`.
///
/// Used both for agent identities and for packing addresses. Derived from
/// the account's public key via double-SHA-256 hashing (see `accord-crypto`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// The standard prefix for all Accord addresses.
    pub const PREFIX: &'static str = "acd_";

    /// Create a new address from a raw string.
    ///
    /// # Panics
    /// Panics if the string does not start with `acd_`.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(s.starts_with(Self::PREFIX), "address must start with acd_");
        Self(s)
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw bytes of the address string.
    ///
    /// This is the byte sequence hashed into a round sort value, and the
    /// scheduler's tie-break comparison key.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Validate that this address is well-formed.
    pub fn is_valid(&self) -> bool {
        self.0.starts_with(Self::PREFIX) && self.0.len() > Self::PREFIX.len()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
