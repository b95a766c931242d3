//! Two-phase vote collection and tallying.
//!
//! Votes for a candidate block are bucketed by `(height, round)` and pass
//! through two phases: pre-vote (phase 1) and pre-commit (phase 2). A bucket
//! lives for a fixed window; once the window elapses without finalization the
//! round is abandoned and the caller advances to the next round — the bucket
//! never blocks liveness.
//!
//! Votes arrive concurrently from the local tick task and from many network
//! peers. The aggregator shards its buckets over a fixed set of mutexes so
//! tally mutation is atomic per bucket without a single global lock. Reads
//! for leading-result computation work on a snapshot copy taken under the
//! shard lock.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use accord_types::{Address, BlockHash, Timestamp};

/// Number of bucket shards. Power of two so the key mix distributes evenly.
const SHARD_COUNT: usize = 16;

/// The two voting phases of one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VotePhase {
    /// Phase 1 — endorse a candidate block.
    PreVote,
    /// Phase 2 — commit to the phase-1 winner.
    PreCommit,
}

impl VotePhase {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::PreVote => 1,
            Self::PreCommit => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::PreVote),
            2 => Some(Self::PreCommit),
            _ => None,
        }
    }
}

/// One recorded vote. Immutable; appended to its bucket, never removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteData {
    pub height: u64,
    pub round: u16,
    pub candidate: BlockHash,
    pub voter: Address,
    /// When the vote was recorded locally.
    pub received_at: Timestamp,
}

/// Outcome of recording a single vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Counted toward the phase tally.
    Accepted,
    /// The voter already voted in this phase for this bucket. No-op.
    Duplicate,
    /// Arrived after the bucket closed. Kept for audit, not tallied.
    Late,
}

/// Votes and tally for one phase of one bucket.
#[derive(Clone, Debug, Default)]
struct PhaseBook {
    votes: Vec<VoteData>,
    voters: HashSet<Address>,
    tally: HashMap<BlockHash, u64>,
}

impl PhaseBook {
    fn record(&mut self, vote: VoteData) -> VoteOutcome {
        if !self.voters.insert(vote.voter.clone()) {
            return VoteOutcome::Duplicate;
        }
        *self.tally.entry(vote.candidate).or_insert(0) += 1;
        self.votes.push(vote);
        VoteOutcome::Accepted
    }

    /// Highest-count candidate. Ties break to the lowest hash so replays
    /// under different vote arrival orders reach the same result.
    fn leading(&self) -> Option<(BlockHash, u64)> {
        self.tally
            .iter()
            .max_by_key(|&(hash, count)| (*count, std::cmp::Reverse(*hash)))
            .map(|(hash, count)| (*hash, *count))
    }
}

/// Vote bucket for one `(height, round)` pair.
#[derive(Clone, Debug)]
pub struct PbftData {
    /// When the bucket opened (first vote seen).
    pub start_time: Timestamp,
    /// Hard deadline; votes after this instant no longer count.
    pub end_time: Timestamp,
    phase1: PhaseBook,
    phase2: PhaseBook,
    /// Votes that arrived after the window — retained for audit only.
    late_votes: Vec<VoteData>,
    closed: bool,
}

impl PbftData {
    fn new(now: Timestamp, lifetime_secs: u64) -> Self {
        Self {
            start_time: now,
            end_time: now.plus_secs(lifetime_secs),
            phase1: PhaseBook::default(),
            phase2: PhaseBook::default(),
            late_votes: Vec::new(),
            closed: false,
        }
    }

    fn book(&self, phase: VotePhase) -> &PhaseBook {
        match phase {
            VotePhase::PreVote => &self.phase1,
            VotePhase::PreCommit => &self.phase2,
        }
    }

    fn book_mut(&mut self, phase: VotePhase) -> &mut PhaseBook {
        match phase {
            VotePhase::PreVote => &mut self.phase1,
            VotePhase::PreCommit => &mut self.phase2,
        }
    }

    /// Number of tallied votes in a phase.
    pub fn vote_count(&self, phase: VotePhase) -> usize {
        self.book(phase).votes.len()
    }

    /// Number of late (untallied) votes.
    pub fn late_count(&self) -> usize {
        self.late_votes.len()
    }
}

/// Collects and tallies votes across all open buckets of one chain.
///
/// All methods take `&self`; mutation is serialized per shard.
pub struct VoteAggregator {
    shards: Vec<Mutex<HashMap<(u64, u16), PbftData>>>,
    bucket_lifetime_secs: u64,
}

impl VoteAggregator {
    pub fn new(bucket_lifetime_secs: u64) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards,
            bucket_lifetime_secs,
        }
    }

    fn shard(&self, height: u64, round: u16) -> &Mutex<HashMap<(u64, u16), PbftData>> {
        let mix = height.wrapping_mul(31).wrapping_add(round as u64);
        &self.shards[(mix as usize) % SHARD_COUNT]
    }

    /// Record one vote.
    ///
    /// The bucket is created lazily on the first vote for its key. A voter
    /// may cast at most one vote per phase per bucket; duplicates are a
    /// local no-op reported as [`VoteOutcome::Duplicate`]. Votes delivered
    /// after the window closes are kept for audit but must not retroactively
    /// finalize the round, so they never touch the tally.
    pub fn record_vote(
        &self,
        phase: VotePhase,
        height: u64,
        round: u16,
        candidate: BlockHash,
        voter: Address,
        now: Timestamp,
    ) -> VoteOutcome {
        let mut shard = self.shard(height, round).lock().expect("vote shard poisoned");
        let bucket = shard
            .entry((height, round))
            .or_insert_with(|| PbftData::new(now, self.bucket_lifetime_secs));

        let vote = VoteData {
            height,
            round,
            candidate,
            voter,
            received_at: now,
        };

        if bucket.closed || now >= bucket.end_time {
            tracing::debug!(
                height,
                round,
                voter = %vote.voter,
                "late vote retained for audit"
            );
            bucket.late_votes.push(vote);
            return VoteOutcome::Late;
        }

        let outcome = bucket.book_mut(phase).record(vote);
        if outcome == VoteOutcome::Duplicate {
            tracing::debug!(height, round, phase = phase.as_u8(), "duplicate vote rejected");
        }
        outcome
    }

    /// The candidate with the highest count in a phase, with its count.
    ///
    /// Computed from a snapshot taken under the shard lock, so iteration
    /// never races concurrent recording.
    pub fn leading_result(
        &self,
        phase: VotePhase,
        height: u64,
        round: u16,
    ) -> Option<(BlockHash, u64)> {
        let snapshot = {
            let shard = self.shard(height, round).lock().expect("vote shard poisoned");
            shard.get(&(height, round)).map(|b| b.book(phase).clone())
        };
        snapshot.and_then(|book| book.leading())
    }

    /// Whether the pre-commit phase has reached quorum on some candidate.
    ///
    /// A timed-out bucket can never report true: late votes are excluded
    /// from the tally, so the count is frozen at whatever it was when the
    /// window closed.
    pub fn is_finalized(&self, height: u64, round: u16, quorum: u64) -> bool {
        match self.leading_result(VotePhase::PreCommit, height, round) {
            Some((_, count)) => quorum > 0 && count >= quorum,
            None => false,
        }
    }

    /// Whether the bucket's window has elapsed.
    pub fn is_timed_out(&self, height: u64, round: u16, now: Timestamp) -> bool {
        let shard = self.shard(height, round).lock().expect("vote shard poisoned");
        shard
            .get(&(height, round))
            .is_some_and(|b| b.closed || now >= b.end_time)
    }

    /// Close a bucket explicitly. Further votes are audit-only even if the
    /// caller's clock lags the bucket deadline.
    pub fn close(&self, height: u64, round: u16) {
        let mut shard = self.shard(height, round).lock().expect("vote shard poisoned");
        if let Some(bucket) = shard.get_mut(&(height, round)) {
            bucket.closed = true;
        }
    }

    /// Snapshot one bucket (for inspection, audit, metrics).
    pub fn bucket(&self, height: u64, round: u16) -> Option<PbftData> {
        let shard = self.shard(height, round).lock().expect("vote shard poisoned");
        shard.get(&(height, round)).cloned()
    }

    /// Drop one bucket (round advanced past it).
    pub fn remove(&self, height: u64, round: u16) {
        let mut shard = self.shard(height, round).lock().expect("vote shard poisoned");
        shard.remove(&(height, round));
    }

    /// Drop every bucket at or below a finalized height.
    pub fn prune_below(&self, height: u64) {
        for shard in &self.shards {
            shard
                .lock()
                .expect("vote shard poisoned")
                .retain(|(h, _), _| *h > height);
        }
    }

    /// Total number of live buckets.
    pub fn bucket_count(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().expect("vote shard poisoned").len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(n: u8) -> BlockHash {
        BlockHash::new([n; 32])
    }

    fn addr(name: &str) -> Address {
        Address::new(format!("acd_{name}"))
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn aggregator() -> VoteAggregator {
        VoteAggregator::new(10)
    }

    #[test]
    fn first_vote_creates_bucket() {
        let agg = aggregator();
        let outcome = agg.record_vote(VotePhase::PreVote, 5, 1, hash(1), addr("alice"), ts(100));

        assert_eq!(outcome, VoteOutcome::Accepted);
        assert_eq!(agg.bucket_count(), 1);

        let bucket = agg.bucket(5, 1).unwrap();
        assert_eq!(bucket.start_time, ts(100));
        assert_eq!(bucket.end_time, ts(110));
    }

    #[test]
    fn duplicate_vote_rejected() {
        let agg = aggregator();
        agg.record_vote(VotePhase::PreVote, 5, 1, hash(1), addr("alice"), ts(100));
        let dup = agg.record_vote(VotePhase::PreVote, 5, 1, hash(2), addr("alice"), ts(101));

        assert_eq!(dup, VoteOutcome::Duplicate);
        // The first vote stands; the second never entered the tally.
        assert_eq!(
            agg.leading_result(VotePhase::PreVote, 5, 1),
            Some((hash(1), 1))
        );
    }

    #[test]
    fn same_voter_may_vote_in_both_phases() {
        let agg = aggregator();
        let a = agg.record_vote(VotePhase::PreVote, 5, 1, hash(1), addr("alice"), ts(100));
        let b = agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("alice"), ts(101));

        assert_eq!(a, VoteOutcome::Accepted);
        assert_eq!(b, VoteOutcome::Accepted);
    }

    #[test]
    fn phases_tally_independently() {
        let agg = aggregator();
        agg.record_vote(VotePhase::PreVote, 5, 1, hash(1), addr("alice"), ts(100));
        agg.record_vote(VotePhase::PreVote, 5, 1, hash(1), addr("bob"), ts(100));
        agg.record_vote(VotePhase::PreCommit, 5, 1, hash(2), addr("carol"), ts(101));

        assert_eq!(
            agg.leading_result(VotePhase::PreVote, 5, 1),
            Some((hash(1), 2))
        );
        assert_eq!(
            agg.leading_result(VotePhase::PreCommit, 5, 1),
            Some((hash(2), 1))
        );
    }

    #[test]
    fn leading_result_picks_highest_count() {
        let agg = aggregator();
        agg.record_vote(VotePhase::PreVote, 5, 1, hash(1), addr("alice"), ts(100));
        agg.record_vote(VotePhase::PreVote, 5, 1, hash(2), addr("bob"), ts(100));
        agg.record_vote(VotePhase::PreVote, 5, 1, hash(2), addr("carol"), ts(100));

        assert_eq!(
            agg.leading_result(VotePhase::PreVote, 5, 1),
            Some((hash(2), 2))
        );
    }

    #[test]
    fn leading_result_tie_breaks_to_lowest_hash() {
        let agg = aggregator();
        // Insert the higher hash first: arrival order must not matter.
        agg.record_vote(VotePhase::PreVote, 5, 1, hash(9), addr("alice"), ts(100));
        agg.record_vote(VotePhase::PreVote, 5, 1, hash(3), addr("bob"), ts(100));

        assert_eq!(
            agg.leading_result(VotePhase::PreVote, 5, 1),
            Some((hash(3), 1))
        );
    }

    #[test]
    fn leading_result_empty_bucket() {
        let agg = aggregator();
        assert!(agg.leading_result(VotePhase::PreVote, 5, 1).is_none());
    }

    #[test]
    fn finalization_requires_quorum() {
        let agg = aggregator();
        agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("alice"), ts(100));
        agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("bob"), ts(101));

        assert!(!agg.is_finalized(5, 1, 3));

        agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("carol"), ts(102));
        assert!(agg.is_finalized(5, 1, 3));
    }

    #[test]
    fn prevotes_do_not_finalize() {
        let agg = aggregator();
        for name in ["alice", "bob", "carol"] {
            agg.record_vote(VotePhase::PreVote, 5, 1, hash(1), addr(name), ts(100));
        }
        assert!(!agg.is_finalized(5, 1, 3));
    }

    #[test]
    fn zero_quorum_never_finalizes() {
        let agg = aggregator();
        agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("alice"), ts(100));
        assert!(!agg.is_finalized(5, 1, 0));
    }

    #[test]
    fn late_vote_not_tallied() {
        let agg = aggregator();
        agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("alice"), ts(100));

        // Window is [100, 110); 110 is already late.
        let late = agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("bob"), ts(110));

        assert_eq!(late, VoteOutcome::Late);
        assert_eq!(
            agg.leading_result(VotePhase::PreCommit, 5, 1),
            Some((hash(1), 1))
        );
        assert_eq!(agg.bucket(5, 1).unwrap().late_count(), 1);
    }

    #[test]
    fn late_votes_cannot_retroactively_finalize() {
        let agg = aggregator();
        agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("alice"), ts(100));
        agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("bob"), ts(105));

        // Two more arrive after the deadline; quorum of 3 must stay unmet.
        agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("carol"), ts(111));
        agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("dave"), ts(112));

        assert!(!agg.is_finalized(5, 1, 3));
    }

    #[test]
    fn timed_out_bucket_reports_not_finalized() {
        let agg = aggregator();
        agg.record_vote(VotePhase::PreCommit, 5, 1, hash(1), addr("alice"), ts(100));

        assert!(agg.is_timed_out(5, 1, ts(110)));
        assert!(!agg.is_finalized(5, 1, 3));
    }

    #[test]
    fn close_makes_subsequent_votes_late() {
        let agg = aggregator();
        agg.record_vote(VotePhase::PreVote, 5, 1, hash(1), addr("alice"), ts(100));
        agg.close(5, 1);

        // Still inside the nominal window, but the bucket is closed.
        let outcome = agg.record_vote(VotePhase::PreVote, 5, 1, hash(1), addr("bob"), ts(101));
        assert_eq!(outcome, VoteOutcome::Late);
        assert!(agg.is_timed_out(5, 1, ts(101)));
    }

    #[test]
    fn buckets_keyed_by_height_and_round() {
        let agg = aggregator();
        agg.record_vote(VotePhase::PreVote, 5, 1, hash(1), addr("alice"), ts(100));
        agg.record_vote(VotePhase::PreVote, 5, 2, hash(1), addr("alice"), ts(100));
        agg.record_vote(VotePhase::PreVote, 6, 1, hash(1), addr("alice"), ts(100));

        assert_eq!(agg.bucket_count(), 3);
        // Same voter in a different bucket is not a duplicate.
        assert_eq!(
            agg.leading_result(VotePhase::PreVote, 5, 2),
            Some((hash(1), 1))
        );
    }

    #[test]
    fn remove_drops_single_bucket() {
        let agg = aggregator();
        agg.record_vote(VotePhase::PreVote, 5, 1, hash(1), addr("alice"), ts(100));
        agg.record_vote(VotePhase::PreVote, 5, 2, hash(1), addr("alice"), ts(100));

        agg.remove(5, 1);

        assert_eq!(agg.bucket_count(), 1);
        assert!(agg.bucket(5, 1).is_none());
        assert!(agg.bucket(5, 2).is_some());
    }

    #[test]
    fn prune_below_drops_finalized_heights() {
        let agg = aggregator();
        for h in 1..=5u64 {
            agg.record_vote(VotePhase::PreVote, h, 1, hash(1), addr("alice"), ts(100));
        }

        agg.prune_below(3);

        assert_eq!(agg.bucket_count(), 2);
        assert!(agg.bucket(3, 1).is_none());
        assert!(agg.bucket(4, 1).is_some());
        assert!(agg.bucket(5, 1).is_some());
    }

    #[test]
    fn concurrent_voting_is_consistent() {
        use std::sync::Arc;

        let agg = Arc::new(aggregator());
        let mut handles = Vec::new();

        for i in 0..8 {
            let agg = Arc::clone(&agg);
            handles.push(std::thread::spawn(move || {
                for v in 0..50 {
                    agg.record_vote(
                        VotePhase::PreCommit,
                        7,
                        1,
                        hash(1),
                        Address::new(format!("acd_voter_{i}_{v}")),
                        ts(100),
                    );
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            agg.leading_result(VotePhase::PreCommit, 7, 1),
            Some((hash(1), 400))
        );
        assert!(agg.is_finalized(7, 1, 400));
    }

    #[test]
    fn phase_roundtrip() {
        assert_eq!(VotePhase::from_u8(1), Some(VotePhase::PreVote));
        assert_eq!(VotePhase::from_u8(2), Some(VotePhase::PreCommit));
        assert_eq!(VotePhase::from_u8(0), None);
        assert_eq!(VotePhase::from_u8(3), None);
        assert_eq!(VotePhase::PreVote.as_u8(), 1);
        assert_eq!(VotePhase::PreCommit.as_u8(), 2);
    }
}
