//! Round scheduling — the deterministic, verifiable packing order.
//!
//! Every node derives the same member ordering for a round from nothing but
//! the agent set and the round start time: each member's sort value is a
//! double SHA-256 of its packing address and the round start, so the order
//! is unpredictable ahead of the round yet reproducible by anyone. This is
//! what lets a validator check that a received block was packed by the
//! member the slot belonged to.

use accord_registry::StakeRegistry;
use accord_types::{Address, ChainId, Timestamp};

use crate::error::ConsensusError;

/// One agent's seat in a round.
///
/// Created fresh each round by the scheduler and discarded at round end.
/// Immutable after creation except [`MeetingMember::revoke_key`], which is a
/// set-once transition used when a penalty lands mid-round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeetingMember {
    /// The round this seat belongs to (monotonic, starts at 1).
    pub round_index: u64,
    /// When the round began.
    pub round_start: Timestamp,
    /// The agent's identity address.
    pub agent_address: Address,
    /// The address whose key signs the packed block.
    pub packing_address: Address,
    /// `sha256d(packing_address ‖ round_start)` — the total-order key.
    pub sort_value: [u8; 32],
    /// 0-based position in the round's packing order.
    pub packing_index: u32,
    /// Start of this member's packing window (inclusive).
    pub pack_start: Timestamp,
    /// End of this member's packing window (exclusive).
    pub pack_end: Timestamp,
    /// The agent's effective stake weight when the round was scheduled.
    pub weight: u128,
    /// Whether the member still holds its packing key.
    has_key: bool,
}

impl MeetingMember {
    /// Whether the member may pack in its window.
    pub fn has_key(&self) -> bool {
        self.has_key
    }

    /// Strip the member's packing key for the remainder of the round.
    /// One-way: a key revoked mid-round is not restored until rescheduling.
    pub fn revoke_key(&mut self) {
        self.has_key = false;
    }

    /// Whether `time` falls inside this member's packing window.
    pub fn window_contains(&self, time: Timestamp) -> bool {
        self.pack_start <= time && time < self.pack_end
    }
}

/// Derives the packing order for consensus rounds of one chain.
///
/// The computation is pure: it only reads an immutable snapshot of the agent
/// set, so no synchronization is needed beyond what the registry provides.
pub struct RoundScheduler {
    chain: ChainId,
    block_interval_secs: u64,
}

impl RoundScheduler {
    pub fn new(chain: ChainId, block_interval_secs: u64) -> Result<Self, ConsensusError> {
        if block_interval_secs == 0 {
            return Err(ConsensusError::ZeroInterval);
        }
        Ok(Self {
            chain,
            block_interval_secs,
        })
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    /// Compute the ordered member list for one round.
    ///
    /// Members are sorted ascending by the byte-lexicographic value of their
    /// sort hash; an exact hash collision (astronomically unlikely) falls
    /// back to packing-address byte order so the order stays total. Each
    /// member's packing window is `block_interval_secs` wide, starting at
    /// `round_start + packing_index * block_interval_secs`.
    ///
    /// Agents under penalty (no packing key) are left out of the order.
    /// Returns [`ConsensusError::EmptyRound`] when nobody is eligible —
    /// fatal for liveness, surfaced to the caller rather than retried here.
    pub fn schedule(
        &self,
        round_index: u64,
        round_start: Timestamp,
        registry: &dyn StakeRegistry,
    ) -> Result<Vec<MeetingMember>, ConsensusError> {
        if round_index == 0 {
            return Err(ConsensusError::ZeroRound);
        }

        let mut members: Vec<MeetingMember> = registry
            .eligible_agents(self.chain)
            .into_iter()
            .filter(|agent| !registry.is_penalized(&agent.agent_address))
            .map(|agent| {
                let sort_value = sort_value(&agent.packing_address, round_start);
                let weight = registry.effective_weight(self.chain, &agent.agent_address);
                MeetingMember {
                    round_index,
                    round_start,
                    agent_address: agent.agent_address,
                    packing_address: agent.packing_address,
                    sort_value,
                    packing_index: 0,
                    pack_start: Timestamp::EPOCH,
                    pack_end: Timestamp::EPOCH,
                    weight,
                    has_key: true,
                }
            })
            .collect();

        if members.is_empty() {
            return Err(ConsensusError::EmptyRound { round_index });
        }

        members.sort_by(|a, b| {
            a.sort_value
                .cmp(&b.sort_value)
                .then_with(|| a.packing_address.as_bytes().cmp(b.packing_address.as_bytes()))
        });

        for (index, member) in members.iter_mut().enumerate() {
            member.packing_index = index as u32;
            member.pack_start =
                round_start.plus_secs(index as u64 * self.block_interval_secs);
            member.pack_end =
                round_start.plus_secs((index as u64 + 1) * self.block_interval_secs);
        }

        Ok(members)
    }
}

/// The total-order key: `sha256d(packing_address ‖ big-endian round start)`.
fn sort_value(packing_address: &Address, round_start: Timestamp) -> [u8; 32] {
    accord_crypto::sha256d_multi(&[
        packing_address.as_bytes(),
        &round_start.as_secs().to_be_bytes(),
    ])
}

/// The member whose packing window contains `time`, if any.
///
/// Used to verify that an incoming block was produced in its packer's
/// assigned slot.
pub fn expected_packer(members: &[MeetingMember], time: Timestamp) -> Option<&MeetingMember> {
    members
        .iter()
        .find(|m| m.has_key() && m.window_contains(time))
}

/// The smallest vote count whose share of `member_count` reaches the quorum
/// fraction (`quorum_bps` basis points).
pub fn quorum_count(member_count: usize, quorum_bps: u64) -> u64 {
    let total = member_count as u64;
    // ceil(total * bps / 10_000)
    (total * quorum_bps).div_ceil(10_000)
}
