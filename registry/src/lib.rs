//! Stake registry — the set of registered producer candidates and their
//! delegated stake.
//!
//! The agreement layer never mutates this state; agent registration and
//! deposit bookkeeping happen in the transaction-processing subsystem. This
//! crate defines the data model, the [`StakeRegistry`] contract consumed by
//! the round scheduler, and an in-memory implementation used by the node
//! and by tests.

pub mod agent;
pub mod registry;

pub use agent::{Agent, Deposit};
pub use registry::{AgentRegistry, StakeRegistry};
