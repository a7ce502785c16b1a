//! Error taxonomy.
//!
//! Configuration problems are rejected when the strategy config is built.
//! Wager errors always carry the currency so a multi-currency pass can
//! report the failure and move on to the next currency.

use rust_decimal::Decimal;
use thiserror::Error;

/// Invalid strategy or transfer configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: Decimal },

    #[error("auto-withdraw is enabled but no withdrawal address is configured")]
    MissingWithdrawalAddress,

    #[error("price refresh interval must be greater than zero")]
    ZeroRefreshInterval,
}

/// A wager that could not be carried out for one currency.
#[derive(Debug, Error)]
pub enum WagerError {
    #[error("[{currency}] balance lookup failed: {reason}")]
    Balance { currency: String, reason: String },

    #[error("[{currency}] wager submission failed: {reason}")]
    Submit { currency: String, reason: String },

    #[error("[{currency}] no faucet balance to roll")]
    NoFaucetBalance { currency: String },

    #[error("[{currency}] computed stake is zero")]
    ZeroStake { currency: String },
}

impl WagerError {
    /// The currency the failure belongs to.
    pub fn currency(&self) -> &str {
        match self {
            WagerError::Balance { currency, .. }
            | WagerError::Submit { currency, .. }
            | WagerError::NoFaucetBalance { currency }
            | WagerError::ZeroStake { currency } => currency,
        }
    }
}
