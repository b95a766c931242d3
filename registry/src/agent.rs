//! Agent — a registered block-producer candidate — and the deposits
//! delegated to it.

use accord_types::{Address, TxHash};
use serde::{Deserialize, Serialize};

/// A registered block-producer candidate.
///
/// Immutable once registered; re-registration replaces the record wholesale.
/// Consensus weight is the agent's own margin plus all active deposits
/// delegated to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// The agent's identity address (receives penalties, owns the margin).
    pub agent_address: Address,
    /// The address whose key actually signs packed blocks and votes.
    pub packing_address: Address,
    /// Where block rewards are paid out.
    pub reward_address: Address,
    /// The agent's own bonded stake.
    pub margin: u128,
    /// Commission taken from delegator rewards, in basis points.
    pub commission_bps: u16,
    /// Hash of the registration transaction.
    pub reg_tx_hash: TxHash,
}

/// A stake delegation toward an agent.
///
/// Many deposits may target the same agent; their sum plus the agent's
/// margin forms the agent's effective weight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// The delegating account.
    pub delegator: Address,
    /// Delegated amount.
    pub amount: u128,
    /// The agent this deposit backs.
    pub agent_address: Address,
    /// Hash of the deposit transaction.
    pub tx_hash: TxHash,
}
