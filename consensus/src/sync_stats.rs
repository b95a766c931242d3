//! Fork-choice statistics over peer-reported chain tips.
//!
//! During synchronization the node asks its peers for their best height and
//! hash, then checks whether enough of them agree on a single `(height,
//! hash)` pair to justify adopting that branch. The computation is a pure
//! function over the observation snapshot: it holds no state between calls
//! and can run on any number of synchronization workers concurrently.

use std::collections::HashMap;

use accord_types::{BlockHash, ConsensusParams};

/// One peer's report of its best block. Ephemeral; never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeObservation {
    pub node_id: String,
    pub height: u64,
    pub hash: BlockHash,
}

impl NodeObservation {
    pub fn new(node_id: impl Into<String>, height: u64, hash: BlockHash) -> Self {
        Self {
            node_id: node_id.into(),
            height,
            hash,
        }
    }
}

/// The branch the network agrees on, and the peers to sync it from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncTarget {
    /// Peers in the winning group, in observation order.
    pub nodes: Vec<String>,
    pub height: u64,
    pub hash: BlockHash,
}

/// Decide whether the observations carry quorum for one branch.
///
/// Observations are grouped by exact `(height, hash)` identity — compatible
/// sub-branches are never merged. The largest group wins only if it alone
/// reaches the consistency threshold: with the default 8000 bps, 80 of 100
/// agreeing passes and 79 of 100 returns `None` (no partial list). Group-size
/// ties resolve to the higher height, then the lower hash, so concurrent
/// workers always pick the same group.
pub fn evaluate_observations(
    observations: &[NodeObservation],
    consistency_threshold_bps: u64,
) -> Option<SyncTarget> {
    if observations.is_empty() {
        return None;
    }

    let mut groups: HashMap<(u64, BlockHash), Vec<&str>> = HashMap::new();
    for obs in observations {
        groups
            .entry((obs.height, obs.hash))
            .or_default()
            .push(obs.node_id.as_str());
    }

    let ((height, hash), members) = groups
        .into_iter()
        .max_by_key(|((height, hash), members)| {
            (members.len(), *height, std::cmp::Reverse(*hash))
        })?;

    let total = observations.len() as u64;
    if (members.len() as u64) * 10_000 < total * consistency_threshold_bps {
        tracing::debug!(
            height,
            agreeing = members.len(),
            total,
            "no fork-choice quorum this cycle"
        );
        return None;
    }

    Some(SyncTarget {
        nodes: members.into_iter().map(str::to_owned).collect(),
        height,
        hash,
    })
}

/// Convenience wrapper using the configured threshold.
pub fn evaluate_with_params(
    observations: &[NodeObservation],
    params: &ConsensusParams,
) -> Option<SyncTarget> {
    evaluate_observations(observations, params.consistency_threshold_bps)
}
