//! Chain identifier for multi-chain nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one blockchain instance running inside a node.
///
/// A node may host several chains at once; every consensus component is
/// instantiated per chain and keyed by this identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(u16);

impl ChainId {
    /// The conventional identifier of the main chain.
    pub const MAIN: Self = Self(1);

    pub fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain-{}", self.0)
    }
}
