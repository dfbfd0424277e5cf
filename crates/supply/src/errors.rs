use crate::total_supply::TotalSupply;
use kaia_reward::RewardError;
use kaia_types::{Address, RebalanceKind};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while tracking or composing the token supply.
#[derive(Debug, Error)]
pub enum SupplyError {
    #[error("invalid supply configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("supply manager is not running")]
    NotRunning,

    #[error("supply checkpoint of block {0} not found")]
    CheckpointNotFound(u64),

    #[error("block {num} is beyond the supply checkpoint frontier {last}")]
    BeyondFrontier { num: u64, last: u64 },

    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("state of block {num} unavailable: {source}")]
    MissingState {
        num: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Reward(#[from] RewardError),

    #[error("supply storage failure: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("{kind} memo of {contract} is not finalized: {reason}")]
    MemoUnresolved {
        kind: RebalanceKind,
        contract: Address,
        reason: String,
    },

    #[error("{kind} contract call failed: {source}")]
    ContractCall {
        kind: RebalanceKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    #[error("interrupted by shutdown")]
    Stopped,

    #[error("total supply of block {} partially resolved: {errors}", .partial.number)]
    Partial {
        partial: Box<TotalSupply>,
        errors: JoinedErrors,
    },
}

/// Errors from independent components, reported together.
#[derive(Debug, Default)]
pub struct JoinedErrors(pub Vec<SupplyError>);

impl JoinedErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, err: SupplyError) {
        self.0.push(err);
    }

    pub fn iter(&self) -> impl Iterator<Item = &SupplyError> {
        self.0.iter()
    }
}

impl fmt::Display for JoinedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}
