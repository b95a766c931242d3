//! Per-chain consensus context — explicit ownership of every chain's
//! consensus machinery.
//!
//! All consensus state for a hosted chain (scheduler, vote aggregator,
//! block voter, driving task) hangs off this object and is reached by
//! reference, never through process-wide statics. Starting a chain spawns
//! its voter task; stopping it cancels the task explicitly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use accord_registry::StakeRegistry;
use accord_types::{ChainId, ConsensusParams, KeyPair, PublicKey, Timestamp};

use accord_messages::VoteMessage;

use crate::metrics::NodeMetrics;
use crate::shutdown::ShutdownController;
use crate::traits::{BlockStore, VoteSender};
use crate::voter::{BlockVoter, VoteDisposition};
use crate::NodeError;

struct ChainHandle {
    voter: Arc<BlockVoter>,
    task: JoinHandle<()>,
}

/// Owns the consensus instances of every hosted chain.
pub struct ConsensusContext {
    params: ConsensusParams,
    registry: Arc<dyn StakeRegistry>,
    store: Arc<dyn BlockStore>,
    sender: Arc<dyn VoteSender>,
    metrics: Arc<NodeMetrics>,
    shutdown: Arc<ShutdownController>,
    chains: Mutex<HashMap<ChainId, ChainHandle>>,
}

impl ConsensusContext {
    pub fn new(
        params: ConsensusParams,
        registry: Arc<dyn StakeRegistry>,
        store: Arc<dyn BlockStore>,
        sender: Arc<dyn VoteSender>,
        metrics: Arc<NodeMetrics>,
        shutdown: Arc<ShutdownController>,
    ) -> Result<Self, NodeError> {
        params.validate()?;
        Ok(Self {
            params,
            registry,
            store,
            sender,
            metrics,
            shutdown,
            chains: Mutex::new(HashMap::new()),
        })
    }

    /// Spawn the voter task for a chain. The keypair is the identity this
    /// node votes under on that chain.
    pub fn start_chain(
        &self,
        chain: ChainId,
        keypair: KeyPair,
    ) -> Result<Arc<BlockVoter>, NodeError> {
        let mut chains = self.chains.lock().expect("chains lock poisoned");
        if chains.contains_key(&chain) {
            return Err(NodeError::ChainAlreadyRunning(chain));
        }

        let voter = Arc::new(BlockVoter::new(
            chain,
            self.params.clone(),
            keypair,
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.sender),
            Arc::clone(&self.metrics),
        )?);

        let task = spawn_tick_loop(
            Arc::clone(&voter),
            self.params.voter_tick_interval_secs,
            self.shutdown.subscribe(),
        );

        self.metrics.active_chains.inc();
        tracing::info!(chain = %chain, "voter task started");
        chains.insert(
            chain,
            ChainHandle {
                voter: Arc::clone(&voter),
                task,
            },
        );
        Ok(voter)
    }

    /// Cancel a chain's voter task.
    pub fn stop_chain(&self, chain: ChainId) -> Result<(), NodeError> {
        let handle = {
            let mut chains = self.chains.lock().expect("chains lock poisoned");
            chains.remove(&chain)
        }
        .ok_or(NodeError::ChainNotRunning(chain))?;

        handle.task.abort();
        self.metrics.active_chains.dec();
        tracing::info!(chain = %chain, "voter task stopped");
        Ok(())
    }

    /// The voter for a running chain.
    pub fn voter(&self, chain: ChainId) -> Option<Arc<BlockVoter>> {
        let chains = self.chains.lock().expect("chains lock poisoned");
        chains.get(&chain).map(|h| Arc::clone(&h.voter))
    }

    /// Route an inbound vote message to its chain's voter.
    pub fn dispatch_vote(
        &self,
        chain: ChainId,
        msg: &VoteMessage,
        voter_key: &PublicKey,
        now: Timestamp,
    ) -> Result<VoteDisposition, NodeError> {
        let voter = self.voter(chain).ok_or(NodeError::ChainNotRunning(chain))?;
        voter.on_vote_message(msg, voter_key, now)
    }

    /// Chains with a running voter task.
    pub fn running_chains(&self) -> Vec<ChainId> {
        let chains = self.chains.lock().expect("chains lock poisoned");
        chains.keys().copied().collect()
    }

    /// Trigger shutdown and wait for every voter task to wind down.
    pub async fn stop_all(&self) {
        self.shutdown.shutdown();
        let handles: Vec<ChainHandle> = {
            let mut chains = self.chains.lock().expect("chains lock poisoned");
            chains.drain().map(|(_, h)| h).collect()
        };
        for handle in handles {
            if handle.task.await.is_ok() {
                self.metrics.active_chains.dec();
            }
        }
    }
}

/// The driving loop: tick on a fixed cadence, exit on shutdown.
fn spawn_tick_loop(
    voter: Arc<BlockVoter>,
    tick_interval_secs: u64,
    mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(tick_interval_secs));
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::debug!(chain = %voter.chain(), "voter loop exiting");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = voter.on_tick(Timestamp::now()) {
                        tracing::warn!(chain = %voter.chain(), error = %e, "voter tick failed");
                    }
                }
            }
        }
    })
}
