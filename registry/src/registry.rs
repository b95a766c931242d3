//! In-memory agent registry and the `StakeRegistry` contract.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use accord_types::{Address, ChainId, TxHash};

use crate::agent::{Agent, Deposit};

/// The stake-registry contract consumed by the round scheduler.
///
/// Implementations must return a consistent snapshot: the agent set must not
/// change observably during one scheduling call.
pub trait StakeRegistry: Send + Sync {
    /// All registered agents for a chain, with deposits already folded into
    /// [`Agent::margin`]-independent weight via [`StakeRegistry::effective_weight`].
    fn eligible_agents(&self, chain: ChainId) -> Vec<Agent>;

    /// Whether an agent is currently under penalty (loses its packing key).
    fn is_penalized(&self, agent: &Address) -> bool;

    /// The agent's margin plus all active deposits delegated to it.
    fn effective_weight(&self, chain: ChainId, agent: &Address) -> u128;
}

/// Per-chain agent and deposit books.
#[derive(Default)]
struct ChainBook {
    /// agent_address → agent record.
    agents: HashMap<Address, Agent>,
    /// agent_address → active deposits backing it.
    deposits: HashMap<Address, Vec<Deposit>>,
}

/// An in-memory stake registry.
///
/// Owned and mutated by the transaction-processing side; the agreement layer
/// only reads it through the [`StakeRegistry`] trait. Mutation and reads are
/// serialized through an interior lock so the scheduler always sees a
/// consistent snapshot.
pub struct AgentRegistry {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    chains: HashMap<ChainId, ChainBook>,
    /// Agents currently under penalty, by agent address.
    penalized: HashSet<Address>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Register an agent, replacing any existing record wholesale.
    ///
    /// Re-registration drops the previous record but keeps deposits that
    /// target the agent address.
    pub fn register_agent(&self, chain: ChainId, agent: Agent) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner
            .chains
            .entry(chain)
            .or_default()
            .agents
            .insert(agent.agent_address.clone(), agent);
    }

    /// Remove an agent and all deposits backing it.
    pub fn deregister_agent(&self, chain: ChainId, agent: &Address) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if let Some(book) = inner.chains.get_mut(&chain) {
            book.agents.remove(agent);
            book.deposits.remove(agent);
        }
        inner.penalized.remove(agent);
    }

    /// Add a deposit toward an agent. Deposits to unknown agents are kept:
    /// registration and delegation can arrive in either order.
    pub fn add_deposit(&self, chain: ChainId, deposit: Deposit) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner
            .chains
            .entry(chain)
            .or_default()
            .deposits
            .entry(deposit.agent_address.clone())
            .or_default()
            .push(deposit);
    }

    /// Withdraw a deposit by its transaction hash. Returns true if found.
    pub fn remove_deposit(&self, chain: ChainId, agent: &Address, tx_hash: &TxHash) -> bool {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        let Some(book) = inner.chains.get_mut(&chain) else {
            return false;
        };
        let Some(deposits) = book.deposits.get_mut(agent) else {
            return false;
        };
        let before = deposits.len();
        deposits.retain(|d| d.tx_hash != *tx_hash);
        before != deposits.len()
    }

    /// Put an agent under penalty (it loses its packing key until pardoned).
    pub fn penalize(&self, agent: &Address) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner.penalized.insert(agent.clone());
    }

    /// Lift an agent's penalty.
    pub fn pardon(&self, agent: &Address) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner.penalized.remove(agent);
    }

    /// Number of registered agents on a chain.
    pub fn agent_count(&self, chain: ChainId) -> usize {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.chains.get(&chain).map_or(0, |b| b.agents.len())
    }

    /// Total effective weight across all agents on a chain.
    pub fn total_weight(&self, chain: ChainId) -> u128 {
        let inner = self.inner.read().expect("registry lock poisoned");
        let Some(book) = inner.chains.get(&chain) else {
            return 0;
        };
        book.agents
            .values()
            .map(|a| Self::weight_of(book, &a.agent_address))
            .fold(0u128, |acc, w| acc.saturating_add(w))
    }

    fn weight_of(book: &ChainBook, agent: &Address) -> u128 {
        let margin = book.agents.get(agent).map_or(0, |a| a.margin);
        let delegated = book
            .deposits
            .get(agent)
            .map_or(0u128, |ds| ds.iter().fold(0u128, |acc, d| acc.saturating_add(d.amount)));
        margin.saturating_add(delegated)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StakeRegistry for AgentRegistry {
    fn eligible_agents(&self, chain: ChainId) -> Vec<Agent> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner
            .chains
            .get(&chain)
            .map_or_else(Vec::new, |b| b.agents.values().cloned().collect())
    }

    fn is_penalized(&self, agent: &Address) -> bool {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.penalized.contains(agent)
    }

    fn effective_weight(&self, chain: ChainId, agent: &Address) -> u128 {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner
            .chains
            .get(&chain)
            .map_or(0, |book| Self::weight_of(book, agent))
    }
}
