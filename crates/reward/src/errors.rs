use thiserror::Error;

/// Errors that can occur while computing block rewards.
#[derive(Debug, Error)]
pub enum RewardError {
    #[error("invalid reward ratio {value:?}: {reason}")]
    InvalidRatio { value: String, reason: &'static str },

    #[error("invalid KIP-82 ratio {value:?}: {reason}")]
    InvalidKip82Ratio { value: String, reason: &'static str },

    #[error("number of txs and receipts mismatch: txs={txs}, receipts={receipts}")]
    TxReceiptMismatch { txs: usize, receipts: usize },

    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("receipts of block {0} not found")]
    ReceiptsNotFound(u64),

    #[error("header of block {0} has no base fee")]
    MissingBaseFee(u64),

    #[error("lower block number {lower} is greater than upper block number {upper}")]
    InvertedRange { lower: u64, upper: u64 },

    #[error("upper block number {upper} is greater than the current head {head}")]
    BeyondHead { upper: u64, head: u64 },

    #[error("block range of {len} blocks exceeds the limit of {max}")]
    RangeTooLarge { len: u64, max: u64 },

    #[error("governance parameters unavailable for block {num}: {source}")]
    Governance {
        num: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("staking info unavailable for block {num}: {source}")]
    Staking {
        num: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("cannot recover author of block {num}: {source}")]
    Author {
        num: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    #[error("worker pool unavailable: {0}")]
    WorkerPool(String),
}
