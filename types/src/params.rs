//! Consensus parameters — fixed per network, consumed (not owned) by the core.
//!
//! A misconfigured parameter set can stall every chain on the node, so
//! [`ConsensusParams::validate`] is checked once at startup and the node
//! refuses to proceed on failure rather than silently stalling.

use serde::{Deserialize, Serialize};

use crate::error::AccordError;

/// Threshold fractions are expressed in basis points (1/100 of a percent).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Parameters governing round scheduling, vote tallying, and fork choice.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Seconds each member has to pack its block within a round.
    #[serde(default = "default_block_interval")]
    pub block_interval_secs: u64,

    /// Lifetime of one `(height, round)` vote bucket in seconds. Once the
    /// window elapses without finalization the round is abandoned and the
    /// voter advances to the next round.
    #[serde(default = "default_bucket_lifetime")]
    pub vote_bucket_lifetime_secs: u64,

    /// Fraction of round members whose pre-commit votes finalize a block,
    /// in basis points. Default 6667 (two thirds).
    #[serde(default = "default_quorum_bps")]
    pub quorum_bps: u64,

    /// Fraction of peer observations that must agree on one `(height, hash)`
    /// pair before synchronization adopts that branch, in basis points.
    /// Default 8000 (80%).
    #[serde(default = "default_consistency_bps")]
    pub consistency_threshold_bps: u64,

    /// Cadence of the block-voter driving tick in seconds.
    #[serde(default = "default_tick_interval")]
    pub voter_tick_interval_secs: u64,

    /// How far a fork branch may trail the master tip before it is pruned.
    #[serde(default = "default_fork_prune_depth")]
    pub fork_prune_depth: u64,
}

fn default_block_interval() -> u64 {
    10
}

fn default_bucket_lifetime() -> u64 {
    10
}

fn default_quorum_bps() -> u64 {
    6_667
}

fn default_consistency_bps() -> u64 {
    8_000
}

fn default_tick_interval() -> u64 {
    1
}

fn default_fork_prune_depth() -> u64 {
    1_000
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            block_interval_secs: default_block_interval(),
            vote_bucket_lifetime_secs: default_bucket_lifetime(),
            quorum_bps: default_quorum_bps(),
            consistency_threshold_bps: default_consistency_bps(),
            voter_tick_interval_secs: default_tick_interval(),
            fork_prune_depth: default_fork_prune_depth(),
        }
    }
}

impl ConsensusParams {
    /// Reject parameter sets that would stall or break consensus.
    pub fn validate(&self) -> Result<(), AccordError> {
        if self.block_interval_secs == 0 {
            return Err(AccordError::InvalidParams(
                "block_interval_secs must be positive".into(),
            ));
        }
        if self.vote_bucket_lifetime_secs == 0 {
            return Err(AccordError::InvalidParams(
                "vote_bucket_lifetime_secs must be positive".into(),
            ));
        }
        if self.voter_tick_interval_secs == 0 {
            return Err(AccordError::InvalidParams(
                "voter_tick_interval_secs must be positive".into(),
            ));
        }
        if self.quorum_bps == 0 || self.quorum_bps > BPS_DENOMINATOR {
            return Err(AccordError::InvalidParams(format!(
                "quorum_bps must be in 1..={BPS_DENOMINATOR}"
            )));
        }
        if self.consistency_threshold_bps == 0
            || self.consistency_threshold_bps > BPS_DENOMINATOR
        {
            return Err(AccordError::InvalidParams(format!(
                "consistency_threshold_bps must be in 1..={BPS_DENOMINATOR}"
            )));
        }
        Ok(())
    }
}
