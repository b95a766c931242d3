//! The vote message carried by the network layer between nodes.
//!
//! This is the only wire format the agreement layer owns. The encoding is a
//! fixed 43-byte big-endian prefix — height (8), round (2), phase (1),
//! block hash (32) — followed by the signature bytes; the total frame length
//! is `43 + signature.len()`. The prefix doubles as the byte sequence the
//! voter's key signs.

use accord_types::BlockHash;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the fixed portion preceding the signature.
pub const VOTE_PREFIX_LEN: usize = 8 + 2 + 1 + 32;

/// Errors from decoding a vote message frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("vote frame truncated: {got} bytes, need at least {VOTE_PREFIX_LEN}")]
    Truncated { got: usize },
}

/// A single signed vote, as carried on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMessage {
    pub height: u64,
    pub round: u16,
    /// Voting phase discriminant (1 = pre-vote, 2 = pre-commit).
    pub phase: u8,
    pub block_hash: BlockHash,
    /// Signature over [`VoteMessage::signing_bytes`]. Variable length; the
    /// codec does not assume a particular signature scheme.
    pub signature: Vec<u8>,
}

impl VoteMessage {
    pub fn new(
        height: u64,
        round: u16,
        phase: u8,
        block_hash: BlockHash,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            height,
            round,
            phase,
            block_hash,
            signature,
        }
    }

    /// The 43-byte prefix: what gets signed and what leads the frame.
    pub fn signing_bytes(&self) -> [u8; VOTE_PREFIX_LEN] {
        let mut out = [0u8; VOTE_PREFIX_LEN];
        out[0..8].copy_from_slice(&self.height.to_be_bytes());
        out[8..10].copy_from_slice(&self.round.to_be_bytes());
        out[10] = self.phase;
        out[11..43].copy_from_slice(self.block_hash.as_bytes());
        out
    }

    /// Serialize to the wire frame: prefix followed by the signature.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(VOTE_PREFIX_LEN + self.signature.len());
        out.extend_from_slice(&self.signing_bytes());
        out.extend_from_slice(&self.signature);
        out
    }

    /// Parse a wire frame. Everything after the prefix is the signature;
    /// an empty signature is representable (and rejected later by
    /// verification, not by the codec).
    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() < VOTE_PREFIX_LEN {
            return Err(MessageError::Truncated { got: bytes.len() });
        }
        let height = u64::from_be_bytes(bytes[0..8].try_into().expect("8 bytes"));
        let round = u16::from_be_bytes(bytes[8..10].try_into().expect("2 bytes"));
        let phase = bytes[10];
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[11..43]);

        Ok(Self {
            height,
            round,
            phase,
            block_hash: BlockHash::new(hash),
            signature: bytes[VOTE_PREFIX_LEN..].to_vec(),
        })
    }
}
