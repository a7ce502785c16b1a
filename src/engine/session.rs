//! Session state for percentage-mode betting.
//!
//! One `SessionState` exists per currency per run. It is created from the
//! upstream main balance, updated exactly once per completed wager, and
//! dropped when the run ends. Stop conditions are evaluated before each
//! wager, in a fixed order.

use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

use crate::config::PercentageConfig;
use crate::strategy::percentage::minimum_viable_stake;
use crate::strategy::BetDirective;
use crate::types::{Direction, WagerOutcome};

// ---------------------------------------------------------------------------
// Stop conditions
// ---------------------------------------------------------------------------

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    MaxBetsReached { limit: u32 },
    StopLoss { loss_percent: Decimal },
    TakeProfit { profit_percent: Decimal },
    BalanceTooLow,
}

impl StopReason {
    /// Short, stable description.
    pub fn reason(&self) -> &'static str {
        match self {
            StopReason::MaxBetsReached { .. } => "max bets reached",
            StopReason::StopLoss { .. } => "stop-loss triggered",
            StopReason::TakeProfit { .. } => "take-profit triggered",
            StopReason::BalanceTooLow => "balance too low",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaxBetsReached { limit } => write!(f, "{} ({limit})", self.reason()),
            StopReason::StopLoss { loss_percent } => {
                write!(f, "{} ({:.1}% loss)", self.reason(), loss_percent)
            }
            StopReason::TakeProfit { profit_percent } => {
                write!(f, "{} ({:.1}% profit)", self.reason(), profit_percent)
            }
            StopReason::BalanceTooLow => write!(f, "{}", self.reason()),
        }
    }
}

/// Limits a session is checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLimits {
    pub max_bets: u32,
    pub stop_loss_percent: Decimal,
    pub take_profit_percent: Decimal,
    pub strategy: PercentageConfig,
}

impl SessionLimits {
    /// Limits from the strategy config, with an optional per-run bet cap.
    pub fn new(cfg: &PercentageConfig, max_bets_override: Option<u32>) -> Self {
        Self {
            max_bets: max_bets_override.unwrap_or(cfg.max_bets_per_session),
            stop_loss_percent: cfg.stop_loss_percent,
            take_profit_percent: cfg.take_profit_percent,
            strategy: cfg.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Mutable per-run betting state for one currency.
#[derive(Debug, Clone)]
pub struct SessionState {
    id: Uuid,
    currency: String,
    initial_balance: Decimal,
    current_balance: Decimal,
    bet_count: u64,
    win_count: u64,
    loss_count: u64,
    total_profit: Decimal,
    last_direction: Direction,
    consecutive_wins: u32,
    consecutive_losses: u32,
}

impl SessionState {
    pub fn new(currency: &str, initial_balance: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            currency: currency.to_lowercase(),
            initial_balance,
            current_balance: initial_balance,
            bet_count: 0,
            win_count: 0,
            loss_count: 0,
            total_profit: Decimal::ZERO,
            last_direction: Direction::High,
            consecutive_wins: 0,
            consecutive_losses: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    pub fn current_balance(&self) -> Decimal {
        self.current_balance
    }

    pub fn bet_count(&self) -> u64 {
        self.bet_count
    }

    pub fn win_count(&self) -> u64 {
        self.win_count
    }

    pub fn loss_count(&self) -> u64 {
        self.loss_count
    }

    pub fn total_profit(&self) -> Decimal {
        self.total_profit
    }

    pub fn last_direction(&self) -> Direction {
        self.last_direction
    }

    pub fn consecutive_wins(&self) -> u32 {
        self.consecutive_wins
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    /// Apply a completed wager.
    ///
    /// The balance is taken from the outcome as reported upstream, never
    /// derived from the profit delta.
    pub fn record(&mut self, directive: &BetDirective, outcome: &WagerOutcome) {
        self.bet_count += 1;
        self.total_profit += outcome.profit;
        self.current_balance = outcome.main_balance;
        self.last_direction = directive.direction;

        if outcome.won {
            self.win_count += 1;
            self.consecutive_wins += 1;
            self.consecutive_losses = 0;
        } else {
            self.loss_count += 1;
            self.consecutive_losses += 1;
            self.consecutive_wins = 0;
        }
    }

    /// Percentage of the initial balance lost so far (negative when up).
    /// `None` when the session started from zero.
    pub fn loss_percent(&self) -> Option<Decimal> {
        if self.initial_balance <= Decimal::ZERO {
            return None;
        }
        Some((self.initial_balance - self.current_balance) / self.initial_balance * Decimal::ONE_HUNDRED)
    }

    /// Percentage of the initial balance gained so far (negative when down).
    pub fn profit_percent(&self) -> Option<Decimal> {
        self.loss_percent().map(|loss| -loss)
    }

    /// Win rate in percent; zero before the first bet.
    pub fn win_rate(&self) -> Decimal {
        if self.bet_count == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.win_count) / Decimal::from(self.bet_count) * Decimal::ONE_HUNDRED
    }

    /// First matching stop condition, if any. Checked before every wager.
    pub fn evaluate_stop(&self, limits: &SessionLimits) -> Option<StopReason> {
        if self.bet_count >= u64::from(limits.max_bets) {
            return Some(StopReason::MaxBetsReached {
                limit: limits.max_bets,
            });
        }

        if self.initial_balance > Decimal::ZERO {
            let loss_percent = (self.initial_balance - self.current_balance) / self.initial_balance
                * Decimal::ONE_HUNDRED;
            if loss_percent >= limits.stop_loss_percent {
                return Some(StopReason::StopLoss { loss_percent });
            }

            let profit_percent = (self.current_balance - self.initial_balance) / self.initial_balance
                * Decimal::ONE_HUNDRED;
            if profit_percent >= limits.take_profit_percent {
                return Some(StopReason::TakeProfit { profit_percent });
            }
        }

        if minimum_viable_stake(&limits.strategy, self.current_balance).is_zero() {
            return Some(StopReason::BalanceTooLow);
        }

        None
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            currency: self.currency.clone(),
            bets: self.bet_count,
            wins: self.win_count,
            losses: self.loss_count,
            win_rate: self.win_rate(),
            total_profit: self.total_profit,
            initial_balance: self.initial_balance,
            final_balance: self.current_balance,
            balance_change_percent: self.profit_percent(),
        }
    }
}

/// End-of-session statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub currency: String,
    pub bets: u64,
    pub wins: u64,
    pub losses: u64,
    pub win_rate: Decimal,
    pub total_profit: Decimal,
    pub initial_balance: Decimal,
    pub final_balance: Decimal,
    pub balance_change_percent: Option<Decimal>,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bets={} {}W/{}L win_rate={:.1}% profit={} final={}",
            self.currency.to_uppercase(),
            self.bets,
            self.wins,
            self.losses,
            self.win_rate,
            self.total_profit,
            self.final_balance,
        )?;
        if let Some(change) = self.balance_change_percent {
            write!(f, " change={change:+.1}%")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
