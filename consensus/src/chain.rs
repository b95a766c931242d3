//! Branch arena — the master chain and the forks and orphans competing
//! with it.
//!
//! Branches are held in a slab and refer to each other by index, never by
//! ownership: a fork points at its parent branch and a branch lists its
//! children as indices. This keeps the parent/child tree acyclic from the
//! borrow checker's point of view and makes pruning a plain slot drop.

use accord_types::BlockHash;
use serde::{Deserialize, Serialize};

use crate::error::ConsensusError;

/// Branch classification. Exactly one branch is the master at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainKind {
    /// The currently adopted canonical branch.
    Master,
    /// A competing branch hanging off another branch.
    Fork,
    /// A branch whose ancestry is not yet connected to anything known.
    Orphan,
}

/// Index of a branch inside a [`ChainArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainIdx(usize);

impl ChainIdx {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// A candidate sequence of blocks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chain {
    pub kind: ChainKind,
    /// Height of the first block in `hash_list`.
    pub start_height: u64,
    /// Height of the last block in `hash_list`.
    pub end_height: u64,
    /// Block hashes from `start_height` to `end_height`, in order.
    hash_list: Vec<BlockHash>,
    /// Hash of the block preceding `start_height`.
    pub previous_hash: BlockHash,
    /// The branch this one diverged from, if connected.
    pub parent: Option<ChainIdx>,
    /// Branches that diverged from this one.
    pub children: Vec<ChainIdx>,
}

impl Chain {
    /// Build a branch covering `start_height..=start_height + hashes - 1`.
    ///
    /// The hash list must be non-empty; the length/height invariant
    /// (`hash_list.len() == end_height - start_height + 1`) then holds by
    /// construction and extension.
    pub fn new(
        kind: ChainKind,
        start_height: u64,
        previous_hash: BlockHash,
        hash_list: Vec<BlockHash>,
    ) -> Result<Self, ConsensusError> {
        if hash_list.is_empty() {
            return Err(ConsensusError::EmptyChain);
        }
        let end_height = start_height + hash_list.len() as u64 - 1;
        Ok(Self {
            kind,
            start_height,
            end_height,
            hash_list,
            previous_hash,
            parent: None,
            children: Vec::new(),
        })
    }

    /// The hash at the branch tip.
    pub fn tip(&self) -> BlockHash {
        *self.hash_list.last().expect("chain is never empty")
    }

    /// The hash at an absolute height, if covered by this branch.
    pub fn hash_at(&self, height: u64) -> Option<BlockHash> {
        if height < self.start_height || height > self.end_height {
            return None;
        }
        Some(self.hash_list[(height - self.start_height) as usize])
    }

    /// Append one block to the branch tip.
    pub fn extend(&mut self, hash: BlockHash) {
        self.hash_list.push(hash);
        self.end_height += 1;
    }

    /// Number of blocks covered.
    pub fn len(&self) -> usize {
        self.hash_list.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the constructor rejects empty hash lists
    }

    pub fn hashes(&self) -> &[BlockHash] {
        &self.hash_list
    }
}

/// Slab of branches with index-based parent/child links.
pub struct ChainArena {
    slots: Vec<Option<Chain>>,
    master: Option<ChainIdx>,
}

impl ChainArena {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            master: None,
        }
    }

    fn insert(&mut self, chain: Chain) -> ChainIdx {
        // Reuse the first free slot; pruning leaves holes behind.
        if let Some(free) = self.slots.iter().position(Option::is_none) {
            self.slots[free] = Some(chain);
            ChainIdx(free)
        } else {
            self.slots.push(Some(chain));
            ChainIdx(self.slots.len() - 1)
        }
    }

    /// Install the canonical branch. Fails if one already exists.
    pub fn init_master(&mut self, mut chain: Chain) -> Result<ChainIdx, ConsensusError> {
        if self.master.is_some() {
            return Err(ConsensusError::MasterExists);
        }
        chain.kind = ChainKind::Master;
        chain.parent = None;
        let idx = self.insert(chain);
        self.master = Some(idx);
        Ok(idx)
    }

    /// Attach a fork under `parent`.
    pub fn add_fork(
        &mut self,
        parent: ChainIdx,
        mut chain: Chain,
    ) -> Result<ChainIdx, ConsensusError> {
        if self.get(parent).is_none() {
            return Err(ConsensusError::UnknownChain(parent.0));
        }
        chain.kind = ChainKind::Fork;
        chain.parent = Some(parent);
        let idx = self.insert(chain);
        self.slots[parent.0]
            .as_mut()
            .expect("parent checked above")
            .children
            .push(idx);
        Ok(idx)
    }

    /// Hold an orphan branch until its ancestry connects.
    pub fn add_orphan(&mut self, mut chain: Chain) -> ChainIdx {
        chain.kind = ChainKind::Orphan;
        chain.parent = None;
        self.insert(chain)
    }

    pub fn get(&self, idx: ChainIdx) -> Option<&Chain> {
        self.slots.get(idx.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, idx: ChainIdx) -> Option<&mut Chain> {
        self.slots.get_mut(idx.0).and_then(Option::as_mut)
    }

    /// The canonical branch.
    pub fn master(&self) -> Option<(ChainIdx, &Chain)> {
        let idx = self.master?;
        self.get(idx).map(|c| (idx, c))
    }

    /// Adopt a fork as the new canonical branch.
    ///
    /// The previous master is demoted to a fork hanging off the new master;
    /// the promoted branch is detached from its former parent.
    pub fn promote(&mut self, idx: ChainIdx) -> Result<(), ConsensusError> {
        let Some(chain) = self.get(idx) else {
            return Err(ConsensusError::UnknownChain(idx.0));
        };
        if chain.kind == ChainKind::Master {
            return Err(ConsensusError::AlreadyMaster(idx.0));
        }
        let Some(old_master) = self.master else {
            return Err(ConsensusError::MasterMissing);
        };
        let old_parent = chain.parent;

        // Detach the promoted branch from its former parent.
        if let Some(parent_idx) = old_parent {
            if let Some(parent) = self.get_mut(parent_idx) {
                parent.children.retain(|c| *c != idx);
            }
        }

        {
            let promoted = self.get_mut(idx).expect("checked above");
            promoted.kind = ChainKind::Master;
            promoted.parent = None;
            promoted.children.push(old_master);
        }
        {
            let demoted = self
                .get_mut(old_master)
                .ok_or(ConsensusError::MasterMissing)?;
            demoted.kind = ChainKind::Fork;
            demoted.parent = Some(idx);
        }

        self.master = Some(idx);
        Ok(())
    }

    /// Drop non-master branches whose tip trails `min_height`.
    ///
    /// Children of a pruned branch lose their parent link and survive as
    /// orphans until they are pruned in turn or reconnected.
    pub fn prune_below(&mut self, min_height: u64) -> usize {
        let doomed: Vec<ChainIdx> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let chain = slot.as_ref()?;
                (chain.kind != ChainKind::Master && chain.end_height < min_height)
                    .then_some(ChainIdx(i))
            })
            .collect();

        for idx in &doomed {
            let chain = self.slots[idx.0].take().expect("selected above");
            if let Some(parent_idx) = chain.parent {
                if let Some(parent) = self.get_mut(parent_idx) {
                    parent.children.retain(|c| c != idx);
                }
            }
            for child_idx in chain.children {
                if let Some(child) = self.get_mut(child_idx) {
                    child.parent = None;
                    child.kind = ChainKind::Orphan;
                }
            }
        }
        doomed.len()
    }

    /// Number of live branches.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate live branches with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (ChainIdx, &Chain)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|c| (ChainIdx(i), c)))
    }
}

impl Default for ChainArena {
    fn default() -> Self {
        Self::new()
    }
}
