use crate::address::{Address, Hash};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Amount in the smallest token unit (kei). 1 KAIA = 10^18 kei.
pub type Kei = u128;

/// Helper constant: 1 KAIA expressed in kei.
pub const KEI_PER_KAIA: Kei = 1_000_000_000_000_000_000;

/// Block header fields consumed by reward and supply accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Canonical block hash, as stored by the chain database.
    pub hash: Hash,
    pub parent_hash: Hash,
    pub number: u64,
    /// State trie root after executing the block.
    pub root: Hash,
    /// Total gas consumed by the block's transactions.
    pub gas_used: u64,
    /// Dynamic base fee. Absent before Magma.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee: Option<Kei>,
    /// Account credited with the proposer's share.
    pub rewardbase: Address,
    /// Block timestamp in seconds.
    pub time: u64,
}

impl Header {
    /// Base fee or zero when the block predates dynamic fees.
    pub fn base_fee_or_zero(&self) -> Kei {
        self.base_fee.unwrap_or(0)
    }
}

/// A block with its transaction bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }
}

/// Block selector accepted by read APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockNumber {
    Latest,
    Pending,
    #[serde(untagged)]
    Number(u64),
}

impl BlockNumber {
    /// Resolve a tag against the current head. Pending resolves to the head
    /// because no pending block carries finalized rewards.
    pub fn resolve(self, head: u64) -> u64 {
        match self {
            BlockNumber::Latest | BlockNumber::Pending => head,
            BlockNumber::Number(n) => n,
        }
    }
}

impl From<u64> for BlockNumber {
    fn from(value: u64) -> Self {
        BlockNumber::Number(value)
    }
}
