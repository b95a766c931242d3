//! Prometheus metrics for the Accord node.
//!
//! Rejected votes and round timeouts are the primary operator signal of
//! network health, so every rejection class gets its own counter.  The
//! [`NodeMetrics`] struct owns a dedicated [`Registry`] that a
//! metrics endpoint can encode into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

/// Central collection of all agreement-layer Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Total votes received (local and from peers).
    pub votes_received: IntCounter,
    /// Votes rejected because the voter already voted in that phase.
    pub votes_duplicate: IntCounter,
    /// Votes that arrived after their bucket closed (kept for audit).
    pub votes_late: IntCounter,
    /// Votes rejected for a bad signature or malformed message.
    pub votes_invalid: IntCounter,
    /// Rounds scheduled (including re-schedules after timeouts).
    pub rounds_scheduled: IntCounter,
    /// Rounds abandoned because the vote window elapsed without quorum.
    pub rounds_timed_out: IntCounter,
    /// Rounds that could not start because no agent was eligible.
    pub rounds_empty: IntCounter,
    /// Blocks finalized through the pre-commit quorum.
    pub blocks_finalized: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Currently open vote buckets across all chains.
    pub open_vote_buckets: IntGauge,
    /// Chains with a running voter task.
    pub active_chains: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time from round start to finalization, in seconds.
    pub finalization_secs: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let votes_received = register_int_counter_with_registry!(
            Opts::new("accord_votes_received_total", "Total votes received"),
            registry
        )
        .expect("failed to register votes_received counter");

        let votes_duplicate = register_int_counter_with_registry!(
            Opts::new(
                "accord_votes_duplicate_total",
                "Votes rejected as duplicates (one vote per phase per voter)"
            ),
            registry
        )
        .expect("failed to register votes_duplicate counter");

        let votes_late = register_int_counter_with_registry!(
            Opts::new(
                "accord_votes_late_total",
                "Votes recorded for audit after their bucket closed"
            ),
            registry
        )
        .expect("failed to register votes_late counter");

        let votes_invalid = register_int_counter_with_registry!(
            Opts::new(
                "accord_votes_invalid_total",
                "Votes rejected for bad signatures or malformed messages"
            ),
            registry
        )
        .expect("failed to register votes_invalid counter");

        let rounds_scheduled = register_int_counter_with_registry!(
            Opts::new("accord_rounds_scheduled_total", "Rounds scheduled"),
            registry
        )
        .expect("failed to register rounds_scheduled counter");

        let rounds_timed_out = register_int_counter_with_registry!(
            Opts::new(
                "accord_rounds_timed_out_total",
                "Rounds abandoned without quorum at window end"
            ),
            registry
        )
        .expect("failed to register rounds_timed_out counter");

        let rounds_empty = register_int_counter_with_registry!(
            Opts::new(
                "accord_rounds_empty_total",
                "Scheduling attempts with no eligible agent"
            ),
            registry
        )
        .expect("failed to register rounds_empty counter");

        let blocks_finalized = register_int_counter_with_registry!(
            Opts::new("accord_blocks_finalized_total", "Blocks finalized"),
            registry
        )
        .expect("failed to register blocks_finalized counter");

        let open_vote_buckets = register_int_gauge_with_registry!(
            Opts::new("accord_open_vote_buckets", "Currently open vote buckets"),
            registry
        )
        .expect("failed to register open_vote_buckets gauge");

        let active_chains = register_int_gauge_with_registry!(
            Opts::new("accord_active_chains", "Chains with a running voter"),
            registry
        )
        .expect("failed to register active_chains gauge");

        let finalization_secs = register_histogram_with_registry!(
            HistogramOpts::new(
                "accord_finalization_seconds",
                "Time from round start to finalization"
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 60.0]),
            registry
        )
        .expect("failed to register finalization_secs histogram");

        Self {
            registry,
            votes_received,
            votes_duplicate,
            votes_late,
            votes_invalid,
            rounds_scheduled,
            rounds_timed_out,
            rounds_empty,
            blocks_finalized,
            open_vote_buckets,
            active_chains,
            finalization_secs,
        }
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
