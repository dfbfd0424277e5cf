//! Total supply composition.
//!
//! `total_supply = minted - (burnt_fee + zero_burn + dead_burn + kip103_burn + kip160_burn)`,
//! where the two canonical burn balances are read from the state at the
//! block and the rebalance burns come from their memos.

use crate::errors::{JoinedErrors, SupplyError};
use crate::rebalance::RebalanceBurns;
use kaia_storage::SupplyCheckpoint;
use kaia_types::{Address, Chain, Kei, RebalanceKind};
use serde::{Deserialize, Serialize};

/// Supply figures of one block. Burn components are `None` when they could
/// not be resolved; the totals are only present when every component is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TotalSupply {
    pub number: u64,
    pub total_supply: Option<Kei>,
    pub total_minted: Kei,
    pub total_burnt: Option<Kei>,
    pub burnt_fee: Kei,
    pub zero_burn: Option<Kei>,
    pub dead_burn: Option<Kei>,
    pub kip103_burn: Option<Kei>,
    pub kip160_burn: Option<Kei>,
}

impl TotalSupply {
    fn burn_components(&self) -> [Option<Kei>; 4] {
        [self.zero_burn, self.dead_burn, self.kip103_burn, self.kip160_burn]
    }
}

/// RPC rendering of [`TotalSupply`]: amounts as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalSupplyResponse {
    pub number: u64,
    pub total_supply: Option<String>,
    pub total_minted: String,
    pub total_burnt: Option<String>,
    pub burnt_fee: String,
    pub zero_burn: Option<String>,
    pub dead_burn: Option<String>,
    pub kip103_burn: Option<String>,
    pub kip160_burn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TotalSupplyResponse {
    pub fn new(supply: &TotalSupply, error: Option<String>) -> Self {
        let render = |v: Option<Kei>| v.map(|v| v.to_string());
        Self {
            number: supply.number,
            total_supply: render(supply.total_supply),
            total_minted: supply.total_minted.to_string(),
            total_burnt: render(supply.total_burnt),
            burnt_fee: supply.burnt_fee.to_string(),
            zero_burn: render(supply.zero_burn),
            dead_burn: render(supply.dead_burn),
            kip103_burn: render(supply.kip103_burn),
            kip160_burn: render(supply.kip160_burn),
            error,
        }
    }
}

/// Combine the checkpoint at `num` with the burn components.
///
/// Component failures are collected rather than short-circuited; if any
/// occurred the result is [`SupplyError::Partial`].
pub(crate) fn compose(
    num: u64,
    checkpoint: SupplyCheckpoint,
    chain: &dyn Chain,
    burns: &RebalanceBurns,
) -> Result<TotalSupply, SupplyError> {
    let mut supply = TotalSupply {
        number: num,
        total_minted: checkpoint.minted,
        burnt_fee: checkpoint.burnt_fee,
        ..Default::default()
    };
    let mut errors = JoinedErrors::default();

    let header = chain
        .header_by_number(num)
        .ok_or(SupplyError::BlockNotFound(num))?;
    match chain.state_at(&header.root) {
        Ok(state) => {
            supply.zero_burn = Some(state.balance(&Address::ZERO));
            supply.dead_burn = Some(state.balance(&Address::DEAD));
        }
        Err(source) => errors.push(SupplyError::MissingState { num, source }),
    }

    let config = chain.config();
    match burns.burnt(config, RebalanceKind::Kip103, num) {
        Ok(burnt) => supply.kip103_burn = Some(burnt),
        Err(err) => errors.push(err),
    }
    match burns.burnt(config, RebalanceKind::Kip160, num) {
        Ok(burnt) => supply.kip160_burn = Some(burnt),
        Err(err) => errors.push(err),
    }

    if errors.is_empty() {
        let total_burnt = supply
            .burn_components()
            .iter()
            .flatten()
            .try_fold(supply.burnt_fee, |acc, v| acc.checked_add(*v));
        match total_burnt.and_then(|burnt| Some((burnt, supply.total_minted.checked_sub(burnt)?))) {
            Some((burnt, total)) => {
                supply.total_burnt = Some(burnt);
                supply.total_supply = Some(total);
            }
            None => errors.push(SupplyError::Overflow("total supply")),
        }
    }

    if errors.is_empty() {
        Ok(supply)
    } else {
        Err(SupplyError::Partial {
            partial: Box::new(supply),
            errors,
        })
    }
}
