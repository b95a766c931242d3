//! Collaborator contracts — the narrow interfaces the agreement layer
//! consumes.
//!
//! Transport, persistence, and the stake registry live in other subsystems.
//! The voter only ever talks to them through these traits, which also gives
//! tests a natural seam for in-memory fakes.

use accord_messages::VoteMessage;
use accord_types::{BlockHash, ChainId, Timestamp};

use crate::error::NodeError;

/// The tip of a chain as known to block storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: u64,
    pub hash: BlockHash,
    pub time: Timestamp,
}

/// Block-storage collaborator.
pub trait BlockStore: Send + Sync {
    /// The latest committed header of a chain.
    fn latest_header(&self, chain: ChainId) -> Result<BlockHeader, NodeError>;

    /// Persist a finalized block decision. Called exactly once per height
    /// once the pre-commit phase reaches quorum.
    fn commit_finalized(
        &self,
        chain: ChainId,
        height: u64,
        round: u16,
        hash: BlockHash,
    ) -> Result<(), NodeError>;
}

/// Network-broadcast collaborator. Fire-and-forget: delivery failures are
/// the transport's problem and surface as missing votes, never as errors
/// here.
pub trait VoteSender: Send + Sync {
    fn broadcast_vote(&self, chain: ChainId, message: VoteMessage);
}
