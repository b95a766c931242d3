//! Block voter — the per-chain propose/vote/finalize state machine.
//!
//! One voter runs per hosted chain, driven by a fixed 1-second tick plus
//! handlers for candidate blocks and inbound votes. Per `(height, round)` it
//! walks `Idle → AwaitingPreVote → AwaitingPreCommit → Finalized`; if the
//! round's vote window elapses first, the voter abandons the bucket and
//! re-schedules the same height under the next round index. Timeouts are
//! expected and retried indefinitely — a partition shows up as a run of
//! timed-out rounds, never as a fatal error. Malformed or duplicate votes
//! are rejected locally, logged, and never propagated.

use std::sync::{Arc, Mutex};

use accord_consensus::{
    quorum_count, ConsensusError, MeetingMember, RoundScheduler, VoteAggregator, VoteOutcome,
    VotePhase,
};
use accord_crypto::{derive_address, sign_to_vec, verify_signature_bytes};
use accord_messages::VoteMessage;
use accord_registry::StakeRegistry;
use accord_types::{
    Address, BlockHash, ChainId, ConsensusParams, KeyPair, PublicKey, Timestamp,
};

use crate::metrics::NodeMetrics;
use crate::traits::{BlockStore, VoteSender};
use crate::NodeError;

/// Lifecycle of the voter within one `(height, round)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoterState {
    /// Waiting for the next block to come due.
    Idle,
    /// Round scheduled; collecting pre-votes for a candidate.
    AwaitingPreVote,
    /// Phase-1 quorum seen; collecting pre-commits.
    AwaitingPreCommit,
    /// Block committed; the next tick starts the next height.
    Finalized,
}

/// How an inbound vote was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteDisposition {
    Recorded,
    Duplicate,
    Late,
}

/// Mutable per-round context, guarded by one lock.
struct RoundContext {
    state: VoterState,
    height: u64,
    round: u16,
    round_start: Timestamp,
    members: Vec<MeetingMember>,
    quorum: u64,
    candidate: Option<BlockHash>,
}

/// Drives the consensus cycle for one chain.
pub struct BlockVoter {
    chain: ChainId,
    params: ConsensusParams,
    keypair: KeyPair,
    voter_address: Address,
    scheduler: RoundScheduler,
    aggregator: Arc<VoteAggregator>,
    registry: Arc<dyn StakeRegistry>,
    store: Arc<dyn BlockStore>,
    sender: Arc<dyn VoteSender>,
    metrics: Arc<NodeMetrics>,
    round: Mutex<RoundContext>,
}

impl BlockVoter {
    pub fn new(
        chain: ChainId,
        params: ConsensusParams,
        keypair: KeyPair,
        registry: Arc<dyn StakeRegistry>,
        store: Arc<dyn BlockStore>,
        sender: Arc<dyn VoteSender>,
        metrics: Arc<NodeMetrics>,
    ) -> Result<Self, NodeError> {
        params.validate()?;
        let scheduler = RoundScheduler::new(chain, params.block_interval_secs)?;
        let aggregator = Arc::new(VoteAggregator::new(params.vote_bucket_lifetime_secs));
        let voter_address = derive_address(&keypair.public);

        Ok(Self {
            chain,
            params,
            keypair,
            voter_address,
            scheduler,
            aggregator,
            registry,
            store,
            sender,
            metrics,
            round: Mutex::new(RoundContext {
                state: VoterState::Idle,
                height: 0,
                round: 0,
                round_start: Timestamp::EPOCH,
                members: Vec::new(),
                quorum: 0,
                candidate: None,
            }),
        })
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    /// The address this node votes under.
    pub fn voter_address(&self) -> &Address {
        &self.voter_address
    }

    pub fn state(&self) -> VoterState {
        self.round.lock().expect("round lock poisoned").state
    }

    pub fn current_height(&self) -> u64 {
        self.round.lock().expect("round lock poisoned").height
    }

    pub fn current_round(&self) -> u16 {
        self.round.lock().expect("round lock poisoned").round
    }

    /// The shared vote aggregator (network handlers feed it through
    /// [`BlockVoter::on_vote_message`]; tests inspect it directly).
    pub fn aggregator(&self) -> &Arc<VoteAggregator> {
        &self.aggregator
    }

    /// One driving tick. Begins a round when the chain tip is due for a new
    /// block, finalizes on quorum, and advances the round on timeout.
    pub fn on_tick(&self, now: Timestamp) -> Result<(), NodeError> {
        let mut ctx = self.round.lock().expect("round lock poisoned");
        match ctx.state {
            VoterState::Idle | VoterState::Finalized => {
                self.maybe_begin_round(&mut ctx, now)?;
            }
            VoterState::AwaitingPreVote | VoterState::AwaitingPreCommit => {
                if self.aggregator.is_finalized(ctx.height, ctx.round, ctx.quorum) {
                    self.finalize(&mut ctx, now)?;
                } else if self.round_expired(&ctx, now) {
                    self.advance_round(&mut ctx, now)?;
                }
            }
        }
        self.metrics
            .open_vote_buckets
            .set(self.aggregator.bucket_count() as i64);
        Ok(())
    }

    /// A candidate block for the current height arrived from the network
    /// (or from this node's own packer). Triggers the local pre-vote.
    pub fn on_candidate_block(
        &self,
        height: u64,
        hash: BlockHash,
        now: Timestamp,
    ) -> Result<(), NodeError> {
        let mut ctx = self.round.lock().expect("round lock poisoned");
        if ctx.state != VoterState::AwaitingPreVote || height != ctx.height {
            tracing::debug!(
                chain = %self.chain,
                height,
                current = ctx.height,
                "candidate ignored outside the awaiting-pre-vote window"
            );
            return Ok(());
        }
        ctx.candidate = Some(hash);
        self.cast_own_vote(&ctx, VotePhase::PreVote, hash, now);
        Ok(())
    }

    /// Handle one inbound vote message from a peer.
    ///
    /// Signature failures and unknown phases are protocol violations:
    /// rejected locally, counted, and never retried. Valid votes feed the
    /// aggregator and may advance the state machine.
    pub fn on_vote_message(
        &self,
        msg: &VoteMessage,
        voter_key: &PublicKey,
        now: Timestamp,
    ) -> Result<VoteDisposition, NodeError> {
        let Some(phase) = VotePhase::from_u8(msg.phase) else {
            self.metrics.votes_invalid.inc();
            tracing::warn!(chain = %self.chain, phase = msg.phase, "vote with unknown phase rejected");
            return Err(NodeError::UnknownPhase(msg.phase));
        };

        if !verify_signature_bytes(&msg.signing_bytes(), &msg.signature, voter_key) {
            self.metrics.votes_invalid.inc();
            tracing::warn!(chain = %self.chain, height = msg.height, "vote signature check failed");
            return Err(NodeError::SignatureInvalid);
        }

        let voter = derive_address(voter_key);
        let outcome = self.aggregator.record_vote(
            phase,
            msg.height,
            msg.round,
            msg.block_hash,
            voter,
            now,
        );

        match outcome {
            VoteOutcome::Accepted => {
                self.metrics.votes_received.inc();
                self.progress(now)?;
                Ok(VoteDisposition::Recorded)
            }
            VoteOutcome::Duplicate => {
                self.metrics.votes_duplicate.inc();
                Ok(VoteDisposition::Duplicate)
            }
            VoteOutcome::Late => {
                self.metrics.votes_late.inc();
                Ok(VoteDisposition::Late)
            }
        }
    }

    /// Whether the current round's vote window has elapsed. The bucket is
    /// created lazily on the first vote, so a voteless round is bounded by
    /// the round clock rather than a bucket deadline.
    fn round_expired(&self, ctx: &RoundContext, now: Timestamp) -> bool {
        self.aggregator.is_timed_out(ctx.height, ctx.round, now)
            || ctx
                .round_start
                .has_expired(self.params.vote_bucket_lifetime_secs, now)
    }

    /// Begin the next height's round 1 once the tip header is old enough.
    fn maybe_begin_round(
        &self,
        ctx: &mut RoundContext,
        now: Timestamp,
    ) -> Result<(), NodeError> {
        let header = self.store.latest_header(self.chain)?;
        if !header.time.has_expired(self.params.block_interval_secs, now) {
            return Ok(());
        }
        self.begin_round(ctx, header.height + 1, 1, now)
    }

    fn begin_round(
        &self,
        ctx: &mut RoundContext,
        height: u64,
        round: u16,
        now: Timestamp,
    ) -> Result<(), NodeError> {
        match self.scheduler.schedule(round as u64, now, self.registry.as_ref()) {
            Ok(members) => {
                ctx.quorum = quorum_count(members.len(), self.params.quorum_bps);
                ctx.state = VoterState::AwaitingPreVote;
                ctx.height = height;
                ctx.round = round;
                ctx.round_start = now;
                ctx.members = members;
                ctx.candidate = None;
                self.metrics.rounds_scheduled.inc();
                tracing::info!(
                    chain = %self.chain,
                    height,
                    round,
                    members = ctx.members.len(),
                    quorum = ctx.quorum,
                    "round scheduled"
                );
                Ok(())
            }
            Err(err @ ConsensusError::EmptyRound { .. }) => {
                // Liveness is gone until the registry changes; surface it.
                self.metrics.rounds_empty.inc();
                tracing::error!(chain = %self.chain, height, "no eligible agents for round");
                ctx.state = VoterState::Idle;
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The vote window elapsed without quorum: abandon the bucket and retry
    /// the same height under the next round index.
    fn advance_round(&self, ctx: &mut RoundContext, now: Timestamp) -> Result<(), NodeError> {
        self.aggregator.close(ctx.height, ctx.round);
        self.metrics.rounds_timed_out.inc();
        tracing::warn!(
            chain = %self.chain,
            height = ctx.height,
            round = ctx.round,
            "round timed out without quorum; advancing"
        );
        let next = ctx.round.saturating_add(1);
        self.begin_round(ctx, ctx.height, next, now)
    }

    /// Pre-commit quorum reached: hand the decision to block storage.
    fn finalize(&self, ctx: &mut RoundContext, now: Timestamp) -> Result<(), NodeError> {
        let Some((hash, count)) =
            self.aggregator
                .leading_result(VotePhase::PreCommit, ctx.height, ctx.round)
        else {
            return Ok(());
        };

        if ctx.candidate.is_some_and(|c| c != hash) {
            tracing::debug!(
                chain = %self.chain,
                height = ctx.height,
                "finalized hash differs from the locally observed candidate"
            );
        }

        self.store
            .commit_finalized(self.chain, ctx.height, ctx.round, hash)?;
        self.aggregator.prune_below(ctx.height);
        self.metrics.blocks_finalized.inc();
        self.metrics
            .finalization_secs
            .observe(ctx.round_start.elapsed_since(now) as f64);
        ctx.state = VoterState::Finalized;
        tracing::info!(
            chain = %self.chain,
            height = ctx.height,
            round = ctx.round,
            hash = %hash,
            votes = count,
            "block finalized"
        );
        Ok(())
    }

    /// Move the state machine forward after an accepted vote.
    fn progress(&self, now: Timestamp) -> Result<(), NodeError> {
        let mut ctx = self.round.lock().expect("round lock poisoned");
        match ctx.state {
            VoterState::AwaitingPreVote => {
                if let Some((leading, count)) =
                    self.aggregator
                        .leading_result(VotePhase::PreVote, ctx.height, ctx.round)
                {
                    if count >= ctx.quorum && ctx.quorum > 0 {
                        ctx.state = VoterState::AwaitingPreCommit;
                        self.cast_own_vote(&ctx, VotePhase::PreCommit, leading, now);
                    }
                }
                Ok(())
            }
            VoterState::AwaitingPreCommit => {
                if self.aggregator.is_finalized(ctx.height, ctx.round, ctx.quorum) {
                    self.finalize(&mut ctx, now)?;
                }
                Ok(())
            }
            VoterState::Idle | VoterState::Finalized => Ok(()),
        }
    }

    /// Record this node's own vote and broadcast it — only when this node
    /// holds a seat in the current round (observer nodes stay silent).
    fn cast_own_vote(
        &self,
        ctx: &RoundContext,
        phase: VotePhase,
        hash: BlockHash,
        now: Timestamp,
    ) {
        let is_member = ctx
            .members
            .iter()
            .any(|m| m.packing_address == self.voter_address && m.has_key());
        if !is_member {
            tracing::debug!(chain = %self.chain, "not a round member; observing only");
            return;
        }

        let outcome = self.aggregator.record_vote(
            phase,
            ctx.height,
            ctx.round,
            hash,
            self.voter_address.clone(),
            now,
        );
        if outcome == VoteOutcome::Accepted {
            self.metrics.votes_received.inc();
        }

        let mut msg = VoteMessage::new(ctx.height, ctx.round, phase.as_u8(), hash, Vec::new());
        msg.signature = sign_to_vec(&msg.signing_bytes(), &self.keypair.private);
        self.sender.broadcast_vote(self.chain, msg);
    }
}
