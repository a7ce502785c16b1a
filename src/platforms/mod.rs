//! Dice-site integrations.
//!
//! Defines the `DiceApi` trait the betting engine talks to, the
//! `FaucetClaimer` trait for topping up faucet balances, and a DuckDice
//! REST implementation of `DiceApi`.

pub mod duckdice;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{CurrencyBalance, WagerOutcome, WagerRequest, WithdrawalRequest};

/// Abstraction over a dice site account.
///
/// Transport failures and upstream rejections surface as `Err`. Retries, if
/// any, belong to the implementation; the engine never retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiceApi: Send + Sync {
    /// Main and faucet balances for every currency on the account.
    async fn balances(&self) -> Result<Vec<CurrencyBalance>>;

    /// Place one dice wager and report its outcome with post-bet balances.
    async fn submit_wager(&self, request: WagerRequest) -> Result<WagerOutcome>;

    /// Move the whole faucet balance of `currency` into the main balance.
    async fn cashout_faucet(&self, currency: &str) -> Result<()>;

    /// Send main balance to an external wallet.
    async fn withdraw(&self, request: WithdrawalRequest) -> Result<()>;
}

/// Something that can claim free faucet funds.
///
/// The engine never depends on claim outcomes; claimed funds only matter
/// once they show up in `DiceApi::balances`.
#[async_trait]
pub trait FaucetClaimer: Send + Sync {
    /// Currencies whose faucet can be claimed right now.
    async fn claimable_currencies(&self) -> Result<Vec<String>>;

    /// Claim one faucet and return the amount credited.
    async fn claim(&self, currency: &str) -> Result<Decimal>;
}
