//! Integration tests exercising the full consensus cycle:
//! round scheduling → candidate pre-vote → pre-commit quorum → commit.
//!
//! These tests wire the block voter to in-memory collaborators, verifying
//! the state machine end-to-end — not just the components in isolation.

use std::sync::{Arc, Mutex};

use accord_consensus::VotePhase;
use accord_crypto::{derive_address, keypair_from_seed, sign_to_vec};
use accord_messages::VoteMessage;
use accord_node::{
    BlockHeader, BlockStore, BlockVoter, NodeError, NodeMetrics, VoteDisposition, VoteSender,
    VoterState,
};
use accord_registry::{Agent, AgentRegistry};
use accord_types::{
    Address, BlockHash, ChainId, ConsensusParams, KeyPair, PublicKey, Timestamp, TxHash,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Block storage whose header advances as blocks are committed. Header time
/// stays at the epoch so the next round is always due.
struct MemStore {
    header: Mutex<BlockHeader>,
    commits: Mutex<Vec<(u64, u16, BlockHash)>>,
}

impl MemStore {
    fn new(height: u64, time: Timestamp) -> Self {
        Self {
            header: Mutex::new(BlockHeader {
                height,
                hash: BlockHash::ZERO,
                time,
            }),
            commits: Mutex::new(Vec::new()),
        }
    }

    fn committed(&self) -> Vec<(u64, u16, BlockHash)> {
        self.commits.lock().unwrap().clone()
    }
}

impl BlockStore for MemStore {
    fn latest_header(&self, _chain: ChainId) -> Result<BlockHeader, NodeError> {
        Ok(self.header.lock().unwrap().clone())
    }

    fn commit_finalized(
        &self,
        _chain: ChainId,
        height: u64,
        round: u16,
        hash: BlockHash,
    ) -> Result<(), NodeError> {
        self.commits.lock().unwrap().push((height, round, hash));
        *self.header.lock().unwrap() = BlockHeader {
            height,
            hash,
            time: Timestamp::EPOCH,
        };
        Ok(())
    }
}

/// Collects broadcast votes instead of sending them anywhere.
struct CollectSender {
    sent: Mutex<Vec<VoteMessage>>,
}

impl CollectSender {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<VoteMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl VoteSender for CollectSender {
    fn broadcast_vote(&self, _chain: ChainId, message: VoteMessage) {
        self.sent.lock().unwrap().push(message);
    }
}

fn peer_keypair(seed: u8) -> KeyPair {
    keypair_from_seed(&[seed; 32])
}

/// Register an agent whose packing address belongs to the given seed's key.
fn agent_for(seed: u8) -> Agent {
    let kp = peer_keypair(seed);
    Agent {
        agent_address: Address::new(format!("acd_agent_{seed}")),
        packing_address: derive_address(&kp.public),
        reward_address: Address::new(format!("acd_reward_{seed}")),
        margin: 20_000,
        commission_bps: 1_000,
        reg_tx_hash: TxHash::new([seed; 32]),
    }
}

/// Four agents: the local node (seed 1) plus three peers (seeds 2..4).
/// Quorum at the default 6667 bps is 3 of 4.
fn registry() -> Arc<AgentRegistry> {
    let reg = AgentRegistry::new();
    for seed in 1..=4u8 {
        reg.register_agent(ChainId::MAIN, agent_for(seed));
    }
    Arc::new(reg)
}

struct Harness {
    voter: BlockVoter,
    store: Arc<MemStore>,
    sender: Arc<CollectSender>,
    metrics: Arc<NodeMetrics>,
}

fn harness_with(registry: Arc<AgentRegistry>, tip_time: Timestamp) -> Harness {
    let store = Arc::new(MemStore::new(0, tip_time));
    let sender = Arc::new(CollectSender::new());
    let metrics = Arc::new(NodeMetrics::new());
    let voter = BlockVoter::new(
        ChainId::MAIN,
        ConsensusParams::default(),
        peer_keypair(1),
        registry,
        Arc::clone(&store) as Arc<dyn BlockStore>,
        Arc::clone(&sender) as Arc<dyn VoteSender>,
        Arc::clone(&metrics),
    )
    .unwrap();

    Harness {
        voter,
        store,
        sender,
        metrics,
    }
}

fn harness() -> Harness {
    harness_with(registry(), Timestamp::EPOCH)
}

fn signed_vote(
    kp: &KeyPair,
    height: u64,
    round: u16,
    phase: VotePhase,
    hash: BlockHash,
) -> (VoteMessage, PublicKey) {
    let mut msg = VoteMessage::new(height, round, phase.as_u8(), hash, Vec::new());
    msg.signature = sign_to_vec(&msg.signing_bytes(), &kp.private);
    (msg, kp.public.clone())
}

fn ts(secs: u64) -> Timestamp {
    Timestamp::new(secs)
}

// ---------------------------------------------------------------------------
// 1. Full propose → vote → finalize cycle
// ---------------------------------------------------------------------------

#[test]
fn full_cycle_finalizes_block() {
    let h = harness();
    let candidate = BlockHash::new([0xAB; 32]);

    // Tip is old, so the first tick schedules height 1, round 1.
    h.voter.on_tick(ts(100)).unwrap();
    assert_eq!(h.voter.state(), VoterState::AwaitingPreVote);
    assert_eq!(h.voter.current_height(), 1);
    assert_eq!(h.voter.current_round(), 1);

    // A candidate block arrives: the local node pre-votes and broadcasts.
    h.voter.on_candidate_block(1, candidate, ts(101)).unwrap();
    assert_eq!(h.sender.sent().len(), 1);
    assert_eq!(h.sender.sent()[0].phase, VotePhase::PreVote.as_u8());

    // Two peers pre-vote: phase-1 reaches quorum (3 of 4), so the voter
    // moves to pre-commit and broadcasts its own.
    for seed in [2u8, 3u8] {
        let (msg, key) = signed_vote(&peer_keypair(seed), 1, 1, VotePhase::PreVote, candidate);
        let disp = h.voter.on_vote_message(&msg, &key, ts(102)).unwrap();
        assert_eq!(disp, VoteDisposition::Recorded);
    }
    assert_eq!(h.voter.state(), VoterState::AwaitingPreCommit);
    assert_eq!(h.sender.sent().len(), 2);
    assert_eq!(h.sender.sent()[1].phase, VotePhase::PreCommit.as_u8());

    // Two peers pre-commit: phase-2 quorum finalizes and commits.
    for seed in [2u8, 3u8] {
        let (msg, key) = signed_vote(&peer_keypair(seed), 1, 1, VotePhase::PreCommit, candidate);
        h.voter.on_vote_message(&msg, &key, ts(103)).unwrap();
    }
    assert_eq!(h.voter.state(), VoterState::Finalized);
    assert_eq!(h.store.committed(), vec![(1, 1, candidate)]);
    assert_eq!(h.metrics.blocks_finalized.get(), 1);

    // The next tick starts the next height on top of the committed block.
    h.voter.on_tick(ts(120)).unwrap();
    assert_eq!(h.voter.state(), VoterState::AwaitingPreVote);
    assert_eq!(h.voter.current_height(), 2);
    assert_eq!(h.voter.current_round(), 1);
}

// ---------------------------------------------------------------------------
// 2. Protocol violations are rejected locally
// ---------------------------------------------------------------------------

#[test]
fn duplicate_vote_rejected() {
    let h = harness();
    h.voter.on_tick(ts(100)).unwrap();

    let candidate = BlockHash::new([0xAB; 32]);
    let (msg, key) = signed_vote(&peer_keypair(2), 1, 1, VotePhase::PreVote, candidate);

    assert_eq!(
        h.voter.on_vote_message(&msg, &key, ts(101)).unwrap(),
        VoteDisposition::Recorded
    );
    assert_eq!(
        h.voter.on_vote_message(&msg, &key, ts(102)).unwrap(),
        VoteDisposition::Duplicate
    );
    assert_eq!(h.metrics.votes_duplicate.get(), 1);

    // The tally still holds exactly one vote for the candidate.
    assert_eq!(
        h.voter.aggregator().leading_result(VotePhase::PreVote, 1, 1),
        Some((candidate, 1))
    );
}

#[test]
fn tampered_signature_rejected() {
    let h = harness();
    h.voter.on_tick(ts(100)).unwrap();

    let candidate = BlockHash::new([0xAB; 32]);
    let (mut msg, key) = signed_vote(&peer_keypair(2), 1, 1, VotePhase::PreVote, candidate);
    msg.signature[0] ^= 0xFF;

    let result = h.voter.on_vote_message(&msg, &key, ts(101));
    assert!(matches!(result, Err(NodeError::SignatureInvalid)));
    assert_eq!(h.metrics.votes_invalid.get(), 1);
    assert!(h
        .voter
        .aggregator()
        .leading_result(VotePhase::PreVote, 1, 1)
        .is_none());
}

#[test]
fn malformed_signature_length_rejected() {
    let h = harness();
    h.voter.on_tick(ts(100)).unwrap();

    let kp = peer_keypair(2);
    let msg = VoteMessage::new(1, 1, 1, BlockHash::new([1; 32]), vec![0xAA; 12]);
    let result = h.voter.on_vote_message(&msg, &kp.public, ts(101));
    assert!(matches!(result, Err(NodeError::SignatureInvalid)));
}

#[test]
fn unknown_phase_rejected() {
    let h = harness();
    h.voter.on_tick(ts(100)).unwrap();

    let kp = peer_keypair(2);
    let mut msg = VoteMessage::new(1, 1, 7, BlockHash::new([1; 32]), Vec::new());
    msg.signature = sign_to_vec(&msg.signing_bytes(), &kp.private);

    let result = h.voter.on_vote_message(&msg, &kp.public, ts(101));
    assert!(matches!(result, Err(NodeError::UnknownPhase(7))));
}

// ---------------------------------------------------------------------------
// 3. Timeouts advance the round, never kill the voter
// ---------------------------------------------------------------------------

#[test]
fn voteless_round_times_out_and_advances() {
    let h = harness();
    h.voter.on_tick(ts(100)).unwrap();
    assert_eq!(h.voter.current_round(), 1);

    // Window is 10 seconds; nothing happened.
    h.voter.on_tick(ts(111)).unwrap();

    assert_eq!(h.voter.state(), VoterState::AwaitingPreVote);
    assert_eq!(h.voter.current_height(), 1);
    assert_eq!(h.voter.current_round(), 2);
    assert_eq!(h.metrics.rounds_timed_out.get(), 1);
}

#[test]
fn sub_quorum_round_times_out() {
    let h = harness();
    h.voter.on_tick(ts(100)).unwrap();

    let candidate = BlockHash::new([0xAB; 32]);
    let (msg, key) = signed_vote(&peer_keypair(2), 1, 1, VotePhase::PreCommit, candidate);
    h.voter.on_vote_message(&msg, &key, ts(101)).unwrap();

    // One pre-commit of a required three: not finalized, and the round
    // advances once the window elapses.
    assert!(!h.voter.aggregator().is_finalized(1, 1, 3));
    h.voter.on_tick(ts(112)).unwrap();

    assert_eq!(h.voter.current_round(), 2);
    assert!(h.store.committed().is_empty());
}

#[test]
fn late_vote_after_timeout_is_audit_only() {
    let h = harness();
    h.voter.on_tick(ts(100)).unwrap();

    let candidate = BlockHash::new([0xAB; 32]);
    let (msg, key) = signed_vote(&peer_keypair(2), 1, 1, VotePhase::PreCommit, candidate);
    h.voter.on_vote_message(&msg, &key, ts(101)).unwrap();

    h.voter.on_tick(ts(112)).unwrap();
    assert_eq!(h.voter.current_round(), 2);

    // Votes for the abandoned round are retained but change nothing.
    for seed in [3u8, 4u8] {
        let (late, key) = signed_vote(&peer_keypair(seed), 1, 1, VotePhase::PreCommit, candidate);
        let disp = h.voter.on_vote_message(&late, &key, ts(113)).unwrap();
        assert_eq!(disp, VoteDisposition::Late);
    }
    assert!(!h.voter.aggregator().is_finalized(1, 1, 3));
    assert!(h.store.committed().is_empty());
    assert_eq!(h.metrics.votes_late.get(), 2);
}

#[test]
fn finalization_still_possible_in_later_round() {
    let h = harness();
    let candidate = BlockHash::new([0xCD; 32]);

    h.voter.on_tick(ts(100)).unwrap();
    h.voter.on_tick(ts(111)).unwrap(); // round 1 → 2
    assert_eq!(h.voter.current_round(), 2);

    h.voter.on_candidate_block(1, candidate, ts(112)).unwrap();
    for seed in [2u8, 3u8] {
        let (msg, key) = signed_vote(&peer_keypair(seed), 1, 2, VotePhase::PreVote, candidate);
        h.voter.on_vote_message(&msg, &key, ts(113)).unwrap();
    }
    for seed in [2u8, 3u8] {
        let (msg, key) = signed_vote(&peer_keypair(seed), 1, 2, VotePhase::PreCommit, candidate);
        h.voter.on_vote_message(&msg, &key, ts(114)).unwrap();
    }

    assert_eq!(h.store.committed(), vec![(1, 2, candidate)]);
}

// ---------------------------------------------------------------------------
// 4. Edge conditions
// ---------------------------------------------------------------------------

#[test]
fn empty_registry_surfaces_error() {
    let h = harness_with(Arc::new(AgentRegistry::new()), Timestamp::EPOCH);

    let result = h.voter.on_tick(ts(100));
    assert!(result.is_err());
    assert_eq!(h.voter.state(), VoterState::Idle);
    assert_eq!(h.metrics.rounds_empty.get(), 1);
}

#[test]
fn no_round_before_block_is_due() {
    // Tip header is fresh: nothing to do yet.
    let h = harness_with(registry(), ts(100));

    h.voter.on_tick(ts(105)).unwrap();
    assert_eq!(h.voter.state(), VoterState::Idle);

    // Once the interval has passed, the round begins.
    h.voter.on_tick(ts(110)).unwrap();
    assert_eq!(h.voter.state(), VoterState::AwaitingPreVote);
}

#[test]
fn observer_without_seat_does_not_broadcast() {
    // Registry holds only peers 2..4; the local key (seed 1) has no seat.
    let reg = AgentRegistry::new();
    for seed in 2..=4u8 {
        reg.register_agent(ChainId::MAIN, agent_for(seed));
    }
    let h = harness_with(Arc::new(reg), Timestamp::EPOCH);

    h.voter.on_tick(ts(100)).unwrap();
    h.voter
        .on_candidate_block(1, BlockHash::new([0xAB; 32]), ts(101))
        .unwrap();

    assert!(h.sender.sent().is_empty());
}

#[test]
fn candidate_for_wrong_height_ignored() {
    let h = harness();
    h.voter.on_tick(ts(100)).unwrap();

    h.voter
        .on_candidate_block(9, BlockHash::new([0xAB; 32]), ts(101))
        .unwrap();

    assert!(h.sender.sent().is_empty());
    assert!(h
        .voter
        .aggregator()
        .leading_result(VotePhase::PreVote, 9, 1)
        .is_none());
}

#[test]
fn votes_for_future_round_are_kept() {
    // Out-of-order delivery: a vote for a round this voter has not reached
    // yet still lands in its bucket and counts once the voter catches up.
    let h = harness();
    h.voter.on_tick(ts(100)).unwrap();

    let candidate = BlockHash::new([0xEF; 32]);
    let (msg, key) = signed_vote(&peer_keypair(2), 1, 2, VotePhase::PreVote, candidate);
    let disp = h.voter.on_vote_message(&msg, &key, ts(101)).unwrap();

    assert_eq!(disp, VoteDisposition::Recorded);
    assert_eq!(
        h.voter.aggregator().leading_result(VotePhase::PreVote, 1, 2),
        Some((candidate, 1))
    );
}
