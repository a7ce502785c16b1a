//! Progressive faucet strategy.
//!
//! Every currency with a faucet balance is rolled all-in. The k-th currency
//! processed in a pass gets `base + (k - 1) * increment` percent win chance.
//! Slots are assigned once, from the balances seen at the start of the pass;
//! currencies without a faucet balance do not take a slot.

use rust_decimal::Decimal;

use super::{BetDirective, StrategyTag};
use crate::config::ProgressiveConfig;
use crate::types::{CurrencyBalance, Direction};

/// One currency's place in a faucet pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoll {
    pub currency: String,
    pub directive: BetDirective,
}

/// Win chance for the `slot`-th currency (1-based).
pub fn win_chance_for_slot(cfg: &ProgressiveConfig, slot: usize) -> Decimal {
    let steps = Decimal::from(slot.saturating_sub(1) as u64);
    cfg.base_win_chance + steps * cfg.win_chance_increment
}

/// All-in directive for a faucet balance at the given slot.
pub fn directive(cfg: &ProgressiveConfig, faucet_balance: Decimal, slot: usize) -> BetDirective {
    BetDirective {
        stake: faucet_balance,
        win_chance: win_chance_for_slot(cfg, slot),
        direction: Direction::from_high(cfg.bet_high),
        tag: StrategyTag::Progressive { slot },
    }
}

/// Assign slots to every currency with a positive faucet balance, in the
/// order the balances were reported.
pub fn plan_pass(cfg: &ProgressiveConfig, balances: &[CurrencyBalance]) -> Vec<PlannedRoll> {
    balances
        .iter()
        .filter(|b| b.has_faucet())
        .enumerate()
        .map(|(i, b)| PlannedRoll {
            currency: b.currency.clone(),
            directive: directive(cfg, b.faucet, i + 1),
        })
        .collect()
}
