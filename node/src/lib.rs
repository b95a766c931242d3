//! Accord agreement-layer node — drives consensus for every hosted chain.
//!
//! The node side of the agreement layer:
//! - Runs one block voter per chain on a fixed 1-second tick
//! - Collects inbound vote messages and feeds the vote aggregator
//! - Signs and broadcasts this node's own votes
//! - Commits finalized blocks through the block-storage collaborator
//! - Exposes structured logs and Prometheus metrics for round health

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod shutdown;
pub mod traits;
pub mod voter;

pub use config::NodeConfig;
pub use context::ConsensusContext;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use shutdown::ShutdownController;
pub use traits::{BlockHeader, BlockStore, VoteSender};
pub use voter::{BlockVoter, VoteDisposition, VoterState};
