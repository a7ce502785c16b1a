//! Percentage-of-balance strategy.
//!
//! Stakes a fixed share of the current main balance. Every
//! `high_risk_frequency`-th wager switches to the high-risk tier; the
//! direction either alternates from the previous wager or stays on the
//! configured default. Tier and direction are decided independently.

use rust_decimal::Decimal;

use super::{stake_for_percent, BetDirective, StrategyTag};
use crate::config::{PercentageConfig, StrategyConfig};
use crate::engine::session::SessionState;
use crate::types::{Direction, RiskTier};

/// Tier for the `bet_number`-th wager of a session (1-based).
pub fn tier_for_bet(cfg: &PercentageConfig, bet_number: u64) -> RiskTier {
    let every = u64::from(cfg.high_risk_frequency);
    if every > 0 && bet_number > 0 && bet_number % every == 0 {
        RiskTier::HighRisk
    } else {
        RiskTier::LowRisk
    }
}

/// `(win_chance, bet_percent)` for a tier.
pub fn tier_params(cfg: &PercentageConfig, tier: RiskTier) -> (Decimal, Decimal) {
    match tier {
        RiskTier::LowRisk => (cfg.low_risk_win_chance, cfg.low_risk_bet_percent),
        RiskTier::HighRisk => (cfg.high_risk_win_chance, cfg.high_risk_bet_percent),
    }
}

/// Direction for the next wager.
pub fn next_direction(config: &StrategyConfig, last: Direction) -> Direction {
    if config.percentage().alternate_direction {
        last.flipped()
    } else {
        config.default_direction()
    }
}

/// Smallest stake the session could place next; zero means it cannot bet.
pub fn minimum_viable_stake(cfg: &PercentageConfig, balance: Decimal) -> Decimal {
    stake_for_percent(balance, cfg.min_bet_percent())
}

/// Decide the next wager of a session.
pub fn select(config: &StrategyConfig, session: &SessionState) -> BetDirective {
    let cfg = config.percentage();
    let tier = tier_for_bet(cfg, session.bet_count() + 1);
    let (win_chance, bet_percent) = tier_params(cfg, tier);

    BetDirective {
        stake: stake_for_percent(session.current_balance(), bet_percent),
        win_chance,
        direction: next_direction(config, session.last_direction()),
        tag: StrategyTag::Percentage(tier),
    }
}
