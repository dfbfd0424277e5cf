//! Governance ratio strings.
//!
//! `"g/x/y"` splits minting between validators and the two funds;
//! `"p/s"` (KIP-82) splits the validators' part between proposer and stakers.
//! Every component is a non-negative integer and the components sum to 100.

use crate::errors::RewardError;
use kaia_types::Kei;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const RATIO_TOTAL: u64 = 100;

/// `floor(amount * numer / denom)` without overflowing the intermediate product.
pub(crate) fn mul_div(amount: Kei, numer: Kei, denom: Kei) -> Kei {
    if denom == 0 {
        return 0;
    }
    (amount / denom) * numer + (amount % denom) * numer / denom
}

fn parse_parts<const N: usize>(value: &str) -> Result<[u64; N], &'static str> {
    let mut parts = [0u64; N];
    let mut fields = value.split('/');
    for slot in parts.iter_mut() {
        let field = fields.next().ok_or("wrong number of components")?;
        *slot = field
            .trim()
            .parse::<u64>()
            .map_err(|_| "component is not a non-negative integer")?;
    }
    if fields.next().is_some() {
        return Err("wrong number of components");
    }
    if parts.iter().try_fold(0u64, |acc, p| acc.checked_add(*p)) != Some(RATIO_TOTAL) {
        return Err("components must sum to 100");
    }
    Ok(parts)
}

/// Three-way minting split: validators / fund1 / fund2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRatio {
    pub validators: u64,
    pub fund1: u64,
    pub fund2: u64,
}

/// Result of [`RewardRatio::split`]. `remainder` is what integer division
/// left over; the caller decides where it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioSplit {
    pub validators: Kei,
    pub fund1: Kei,
    pub fund2: Kei,
    pub remainder: Kei,
}

impl RewardRatio {
    pub fn split(&self, amount: Kei) -> RatioSplit {
        let total = RATIO_TOTAL as Kei;
        let validators = mul_div(amount, self.validators as Kei, total);
        let fund1 = mul_div(amount, self.fund1 as Kei, total);
        let fund2 = mul_div(amount, self.fund2 as Kei, total);
        RatioSplit {
            validators,
            fund1,
            fund2,
            remainder: amount - validators - fund1 - fund2,
        }
    }
}

impl FromStr for RewardRatio {
    type Err = RewardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [validators, fund1, fund2] =
            parse_parts::<3>(s).map_err(|reason| RewardError::InvalidRatio {
                value: s.to_string(),
                reason,
            })?;
        Ok(Self {
            validators,
            fund1,
            fund2,
        })
    }
}

impl fmt::Display for RewardRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.validators, self.fund1, self.fund2)
    }
}

/// KIP-82 split of the validators' share: proposer / stakers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kip82Ratio {
    pub proposer: u64,
    pub stakers: u64,
}

impl Default for Kip82Ratio {
    /// Everything to the proposer, the pre-Kore behavior.
    fn default() -> Self {
        Self {
            proposer: RATIO_TOTAL,
            stakers: 0,
        }
    }
}

impl Kip82Ratio {
    /// Returns `(proposer, stakers, remainder)`.
    pub fn split(&self, amount: Kei) -> (Kei, Kei, Kei) {
        let total = RATIO_TOTAL as Kei;
        let proposer = mul_div(amount, self.proposer as Kei, total);
        let stakers = mul_div(amount, self.stakers as Kei, total);
        (proposer, stakers, amount - proposer - stakers)
    }
}

impl FromStr for Kip82Ratio {
    type Err = RewardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [proposer, stakers] =
            parse_parts::<2>(s).map_err(|reason| RewardError::InvalidKip82Ratio {
                value: s.to_string(),
                reason,
            })?;
        Ok(Self { proposer, stakers })
    }
}

impl fmt::Display for Kip82Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.proposer, self.stakers)
    }
}
