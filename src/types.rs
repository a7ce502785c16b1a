//! Shared types for the dice bot.
//!
//! These types form the data model used across the strategy, engine and
//! platform modules. Monetary quantities are always `Decimal`; amounts cross
//! the wire as strings and must round-trip exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which side of the roll a wager is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Win when the roll lands above the target ("over").
    High,
    /// Win when the roll lands below the target ("under").
    Low,
}

impl Direction {
    pub fn from_high(high: bool) -> Self {
        if high {
            Direction::High
        } else {
            Direction::Low
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, Direction::High)
    }

    /// The opposite side.
    pub fn flipped(&self) -> Self {
        match self {
            Direction::High => Direction::Low,
            Direction::Low => Direction::High,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::High => write!(f, "OVER"),
            Direction::Low => write!(f, "UNDER"),
        }
    }
}

/// Betting mode for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetMode {
    /// All-in faucet rolls with a progressive win chance per currency.
    #[default]
    Faucet,
    /// Percentage-of-balance staking on the main balance.
    Normal,
}

impl fmt::Display for BetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetMode::Faucet => write!(f, "faucet"),
            BetMode::Normal => write!(f, "normal"),
        }
    }
}

impl std::str::FromStr for BetMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "faucet" | "progressive" => Ok(BetMode::Faucet),
            "normal" | "percentage" | "junkhead" => Ok(BetMode::Normal),
            _ => Err(anyhow::anyhow!("Unknown bet mode: {s}")),
        }
    }
}

/// Risk profile of a percentage-mode wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    /// Near-even payout (~2x).
    LowRisk,
    /// Long-shot payout (~8x), placed on a fixed cadence.
    HighRisk,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::LowRisk => write!(f, "LOW-RISK"),
            RiskTier::HighRisk => write!(f, "HIGH-RISK"),
        }
    }
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

/// Balances held for one currency on the dice site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyBalance {
    /// Lower-case currency symbol, e.g. `btc`.
    pub currency: String,
    pub main: Decimal,
    pub faucet: Decimal,
}

impl CurrencyBalance {
    pub fn new(currency: &str, main: Decimal, faucet: Decimal) -> Self {
        Self {
            currency: currency.to_lowercase(),
            main,
            faucet,
        }
    }

    pub fn has_faucet(&self) -> bool {
        self.faucet > Decimal::ZERO
    }
}

/// Look up one currency in a balance listing (case-insensitive).
pub fn find_balance<'a>(balances: &'a [CurrencyBalance], currency: &str) -> Option<&'a CurrencyBalance> {
    balances
        .iter()
        .find(|b| b.currency.eq_ignore_ascii_case(currency))
}

/// A faucet balance together with its USD valuation.
#[derive(Debug, Clone, PartialEq)]
pub struct FaucetHolding {
    pub currency: String,
    pub faucet_balance: Decimal,
    pub main_balance: Decimal,
    pub faucet_usd: Decimal,
}

impl fmt::Display for FaucetHolding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (~${:.4} USD, main: {})",
            self.currency.to_uppercase(),
            self.faucet_balance,
            self.faucet_usd,
            self.main_balance,
        )
    }
}

// ---------------------------------------------------------------------------
// Wagers
// ---------------------------------------------------------------------------

/// A single dice wager as submitted to the betting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WagerRequest {
    pub currency: String,
    pub stake: Decimal,
    /// Win chance in percent, e.g. `49.5`.
    pub win_chance: Decimal,
    pub direction: Direction,
    /// Stake from the faucet balance instead of the main balance.
    pub use_faucet: bool,
}

/// Result of a submitted wager, as reported by the betting collaborator.
///
/// This is the authoritative source for session updates; the bot never
/// decides win/loss or recomputes balances itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WagerOutcome {
    pub won: bool,
    /// Realised profit (negative on a loss).
    pub profit: Decimal,
    /// Informational roll number.
    pub roll_number: u64,
    pub main_balance: Decimal,
    pub faucet_balance: Decimal,
}

impl fmt::Display for WagerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} roll={} profit={}",
            if self.won { "WIN" } else { "LOSS" },
            self.roll_number,
            self.profit,
        )
    }
}

/// A withdrawal to an external wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub currency: String,
    pub address: String,
    pub amount: Decimal,
}

/// Whether a post-wager transfer fired, and whether it went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransferStatus {
    pub triggered: bool,
    pub success: bool,
}

impl TransferStatus {
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn attempted(success: bool) -> Self {
        Self {
            triggered: true,
            success,
        }
    }

    pub fn failed(&self) -> bool {
        self.triggered && !self.success
    }
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// Outcome of one faucet claim attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimResult {
    pub currency: String,
    pub success: bool,
    pub amount: Decimal,
    pub error: Option<String>,
}

impl ClaimResult {
    pub fn claimed(currency: &str, amount: Decimal) -> Self {
        Self {
            currency: currency.to_lowercase(),
            success: true,
            amount,
            error: None,
        }
    }

    pub fn failed(currency: &str, error: impl Into<String>) -> Self {
        Self {
            currency: currency.to_lowercase(),
            success: false,
            amount: Decimal::ZERO,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
