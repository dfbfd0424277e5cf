//! Chain access consumed by reward and supply accounting.
//!
//! The node's database, state trie and consensus engine sit behind these
//! traits. `MemoryChain` is an in-memory backend for tests and tooling.

use crate::address::{Address, Hash};
use crate::block::{Block, Header, Kei};
use crate::fork::ChainConfig;
use crate::receipt::Receipt;
use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Read-only account balance view at a specific state root.
pub trait StateReader: Send + Sync {
    fn balance(&self, address: &Address) -> Kei;

    /// Visit every account with its balance. Used once to bootstrap the
    /// genesis supply, so it may be slow.
    fn for_each_balance(&self, visit: &mut dyn FnMut(&Address, Kei)) -> Result<()>;
}

/// Block, receipt and state access.
pub trait Chain: Send + Sync {
    fn config(&self) -> &ChainConfig;

    /// Header of the current canonical head.
    fn current_block(&self) -> Header;

    fn header_by_number(&self, num: u64) -> Option<Header>;

    fn block_by_number(&self, num: u64) -> Option<Block>;

    fn receipts_by_hash(&self, hash: &Hash) -> Option<Vec<Receipt>>;

    /// Open the state trie at `root`. Fails if the trie was pruned.
    fn state_at(&self, root: &Hash) -> Result<Arc<dyn StateReader>>;

    /// Signer of the block as recovered by the consensus engine. May differ
    /// from the header's rewardbase.
    fn author(&self, header: &Header) -> Result<Address>;

    fn current_number(&self) -> u64 {
        self.current_block().number
    }
}

/// Account balances held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    balances: BTreeMap<Address, Kei>,
}

impl MemoryState {
    pub fn new(balances: impl IntoIterator<Item = (Address, Kei)>) -> Self {
        Self {
            balances: balances.into_iter().collect(),
        }
    }

    pub fn set_balance(&mut self, address: Address, amount: Kei) {
        self.balances.insert(address, amount);
    }
}

impl StateReader for MemoryState {
    fn balance(&self, address: &Address) -> Kei {
        self.balances.get(address).copied().unwrap_or(0)
    }

    fn for_each_balance(&self, visit: &mut dyn FnMut(&Address, Kei)) -> Result<()> {
        for (address, amount) in &self.balances {
            visit(address, *amount);
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemoryChainInner {
    blocks: BTreeMap<u64, Block>,
    receipts: HashMap<Hash, Vec<Receipt>>,
    states: HashMap<Hash, Arc<MemoryState>>,
    authors: HashMap<Hash, Address>,
}

/// In-memory chain backend.
pub struct MemoryChain {
    config: ChainConfig,
    inner: RwLock<MemoryChainInner>,
}

impl MemoryChain {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(MemoryChainInner::default()),
        }
    }

    /// Append a block with its receipts. The highest inserted number is the head.
    pub fn insert_block(&self, block: Block, receipts: Vec<Receipt>) {
        let mut inner = self.inner.write();
        inner.receipts.insert(block.hash(), receipts);
        inner.blocks.insert(block.number(), block);
    }

    /// Attach a state trie under `root`.
    pub fn insert_state(&self, root: Hash, state: MemoryState) {
        self.inner.write().states.insert(root, Arc::new(state));
    }

    /// Drop a state trie, as pruning would.
    pub fn prune_state(&self, root: &Hash) {
        self.inner.write().states.remove(root);
    }

    /// Record the consensus signer of a block.
    pub fn set_author(&self, hash: Hash, author: Address) {
        self.inner.write().authors.insert(hash, author);
    }

    /// Discard every block above `num`.
    pub fn truncate_above(&self, num: u64) {
        let mut inner = self.inner.write();
        let removed: Vec<u64> = inner.blocks.range(num + 1..).map(|(n, _)| *n).collect();
        for n in removed {
            if let Some(block) = inner.blocks.remove(&n) {
                inner.receipts.remove(&block.hash());
            }
        }
    }
}

impl Chain for MemoryChain {
    fn config(&self) -> &ChainConfig {
        &self.config
    }

    fn current_block(&self) -> Header {
        self.inner
            .read()
            .blocks
            .values()
            .next_back()
            .map(|b| b.header.clone())
            .unwrap_or_default()
    }

    fn header_by_number(&self, num: u64) -> Option<Header> {
        self.inner.read().blocks.get(&num).map(|b| b.header.clone())
    }

    fn block_by_number(&self, num: u64) -> Option<Block> {
        self.inner.read().blocks.get(&num).cloned()
    }

    fn receipts_by_hash(&self, hash: &Hash) -> Option<Vec<Receipt>> {
        self.inner.read().receipts.get(hash).cloned()
    }

    fn state_at(&self, root: &Hash) -> Result<Arc<dyn StateReader>> {
        self.inner
            .read()
            .states
            .get(root)
            .cloned()
            .map(|s| s as Arc<dyn StateReader>)
            .ok_or_else(|| anyhow!("missing trie node {root}"))
    }

    fn author(&self, header: &Header) -> Result<Address> {
        self.inner
            .read()
            .authors
            .get(&header.hash)
            .copied()
            .ok_or_else(|| anyhow!("cannot recover signer of block {}", header.number))
    }
}
