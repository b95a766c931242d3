//! Consensus core — block finality for a permissioned-stake network.
//!
//! Round by round, registered agents take turns producing a block in a
//! deterministic but unpredictable order; the produced block is finalized
//! through a PBFT-style two-phase vote (pre-vote, then pre-commit). During
//! synchronization, competing branches reported by peers are resolved by a
//! statistical fork-choice rule.
//!
//! ## Module overview
//!
//! - [`round`] — deterministic packing-order derivation for one round.
//! - [`vote`] — two-phase vote collection and tallying per `(height, round)`.
//! - [`chain`] — the master/fork/orphan branch arena.
//! - [`sync_stats`] — fork-choice statistics over peer observations.
//! - [`error`] — consensus error types.

pub mod chain;
pub mod error;
pub mod round;
pub mod sync_stats;
pub mod vote;

pub use chain::{Chain, ChainArena, ChainIdx, ChainKind};
pub use error::ConsensusError;
pub use round::{expected_packer, quorum_count, MeetingMember, RoundScheduler};
pub use sync_stats::{evaluate_observations, NodeObservation, SyncTarget};
pub use vote::{PbftData, VoteAggregator, VoteData, VoteOutcome, VotePhase};
