use thiserror::Error;

/// Errors raised while building staking snapshots or their configuration.
#[derive(Debug, Error)]
pub enum StakingError {
    #[error("staking arrays differ in length: node_ids={node_ids}, staking_contracts={staking_contracts}, reward_addrs={reward_addrs}, staking_amounts={staking_amounts}")]
    LengthMismatch {
        node_ids: usize,
        staking_contracts: usize,
        reward_addrs: usize,
        staking_amounts: usize,
    },

    #[error("staking update interval must be positive")]
    ZeroInterval,
}
