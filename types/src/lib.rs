//! Fundamental types for the Accord agreement layer.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: chain identifiers, addresses, hashes, timestamps, key material,
//! and the consensus parameter set.

pub mod address;
pub mod chain;
pub mod error;
pub mod hash;
pub mod keys;
pub mod params;
pub mod time;

pub use address::Address;
pub use chain::ChainId;
pub use error::AccordError;
pub use hash::{BlockHash, TxHash};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use params::ConsensusParams;
pub use time::Timestamp;
