//! Strategy selection: stake size, win chance and direction for the next
//! wager.
//!
//! Everything here is a pure function of the strategy configuration and the
//! observed state. Nothing in this module talks to the network or keeps
//! hidden state, so every decision can be reproduced from its inputs.

pub mod percentage;
pub mod progressive;

use rust_decimal::Decimal;
use std::fmt;

use crate::types::{Direction, RiskTier};

/// Which strategy produced a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyTag {
    /// Faucet mode; `slot` is the 1-based position of the currency in the pass.
    Progressive { slot: usize },
    /// Normal mode at the given risk tier.
    Percentage(RiskTier),
}

impl StrategyTag {
    pub fn risk_tier(&self) -> Option<RiskTier> {
        match self {
            StrategyTag::Progressive { .. } => None,
            StrategyTag::Percentage(tier) => Some(*tier),
        }
    }
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyTag::Progressive { slot } => write!(f, "PROGRESSIVE #{slot}"),
            StrategyTag::Percentage(tier) => write!(f, "{tier}"),
        }
    }
}

/// The decision for one wager.
#[derive(Debug, Clone, PartialEq)]
pub struct BetDirective {
    pub stake: Decimal,
    /// Win chance in percent.
    pub win_chance: Decimal,
    pub direction: Direction,
    pub tag: StrategyTag,
}

impl fmt::Display for BetDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] stake={} chance={}% {}",
            self.tag, self.stake, self.win_chance, self.direction,
        )
    }
}

/// `balance * percent / 100`, or zero when either input is not positive.
pub fn stake_for_percent(balance: Decimal, percent: Decimal) -> Decimal {
    if balance <= Decimal::ZERO || percent <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    balance * percent / Decimal::ONE_HUNDRED
}
