//! Mock dice site for integration testing.
//!
//! Provides a deterministic `DiceApi` implementation with scripted roll
//! results, in-memory balances, and a log of every request it received.
//! Also provides a fixed price source, a fixed clock, and a sleeper that
//! records instead of waiting.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dicebot::config::{PercentageConfig, ProgressiveConfig, StrategyConfig, TransferConfig};
use dicebot::data::PriceSource;
use dicebot::engine::orchestrator::Orchestrator;
use dicebot::engine::pacing::{Clock, Sleeper};
use dicebot::engine::runner::{RunOptions, Runner};
use dicebot::engine::valuation::Valuator;
use dicebot::platforms::DiceApi;
use dicebot::types::*;

/// Scripted result of the next roll.
#[derive(Debug, Clone, Copy)]
pub enum Roll {
    /// Win, paying `stake * multiplier` back.
    Win(Decimal),
    Lose,
}

/// A dice site held entirely in memory.
///
/// Rolls are lost unless a win has been scripted with [`MockDice::script`].
#[derive(Default)]
pub struct MockDice {
    balances: Mutex<Vec<CurrencyBalance>>,
    script: Mutex<VecDeque<Roll>>,
    failing: Mutex<HashSet<String>>,
    fail_cashouts: Mutex<bool>,
    fail_withdrawals: Mutex<bool>,
    wagers: Mutex<Vec<WagerRequest>>,
    cashouts: Mutex<Vec<String>>,
    withdrawals: Mutex<Vec<WithdrawalRequest>>,
    roll_counter: Mutex<u64>,
}

impl MockDice {
    pub fn new(balances: Vec<CurrencyBalance>) -> Arc<Self> {
        Arc::new(Self {
            balances: Mutex::new(balances),
            ..Self::default()
        })
    }

    /// Queue roll results, consumed in order.
    pub fn script(&self, rolls: &[Roll]) {
        self.script.lock().unwrap().extend(rolls.iter().copied());
    }

    /// Reject every wager on `currency`.
    pub fn fail_currency(&self, currency: &str) {
        self.failing.lock().unwrap().insert(currency.to_string());
    }

    pub fn fail_cashouts(&self) {
        *self.fail_cashouts.lock().unwrap() = true;
    }

    pub fn fail_withdrawals(&self) {
        *self.fail_withdrawals.lock().unwrap() = true;
    }

    pub fn balance(&self, currency: &str) -> CurrencyBalance {
        find_balance(&self.balances.lock().unwrap(), currency)
            .cloned()
            .unwrap_or_else(|| CurrencyBalance::new(currency, Decimal::ZERO, Decimal::ZERO))
    }

    pub fn wagers(&self) -> Vec<WagerRequest> {
        self.wagers.lock().unwrap().clone()
    }

    pub fn cashouts(&self) -> Vec<String> {
        self.cashouts.lock().unwrap().clone()
    }

    pub fn withdrawals(&self) -> Vec<WithdrawalRequest> {
        self.withdrawals.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiceApi for MockDice {
    async fn balances(&self) -> Result<Vec<CurrencyBalance>> {
        Ok(self.balances.lock().unwrap().clone())
    }

    async fn submit_wager(&self, request: WagerRequest) -> Result<WagerOutcome> {
        if self.failing.lock().unwrap().contains(&request.currency) {
            return Err(anyhow!("HTTP 422: currency {} disabled", request.currency));
        }

        let mut balances = self.balances.lock().unwrap();
        let balance = balances
            .iter_mut()
            .find(|b| b.currency == request.currency)
            .ok_or_else(|| anyhow!("Unknown currency: {}", request.currency))?;

        let available = if request.use_faucet {
            &mut balance.faucet
        } else {
            &mut balance.main
        };
        if request.stake <= Decimal::ZERO || request.stake > *available {
            return Err(anyhow!("Insufficient balance"));
        }

        let roll = self.script.lock().unwrap().pop_front().unwrap_or(Roll::Lose);
        let (won, payout) = match roll {
            Roll::Win(multiplier) => (true, request.stake * multiplier),
            Roll::Lose => (false, Decimal::ZERO),
        };
        *available = *available - request.stake + payout;

        let mut counter = self.roll_counter.lock().unwrap();
        *counter += 1;

        let outcome = WagerOutcome {
            won,
            profit: payout - request.stake,
            roll_number: *counter,
            main_balance: balance.main,
            faucet_balance: balance.faucet,
        };
        self.wagers.lock().unwrap().push(request);
        Ok(outcome)
    }

    async fn cashout_faucet(&self, currency: &str) -> Result<()> {
        if *self.fail_cashouts.lock().unwrap() {
            return Err(anyhow!("Cashout temporarily unavailable"));
        }
        let mut balances = self.balances.lock().unwrap();
        let balance = balances
            .iter_mut()
            .find(|b| b.currency == currency)
            .ok_or_else(|| anyhow!("Unknown currency: {currency}"))?;
        balance.main += balance.faucet;
        balance.faucet = Decimal::ZERO;
        self.cashouts.lock().unwrap().push(currency.to_string());
        Ok(())
    }

    async fn withdraw(&self, request: WithdrawalRequest) -> Result<()> {
        if *self.fail_withdrawals.lock().unwrap() {
            return Err(anyhow!("Withdrawal address rejected"));
        }
        let mut balances = self.balances.lock().unwrap();
        let balance = balances
            .iter_mut()
            .find(|b| b.currency == request.currency)
            .ok_or_else(|| anyhow!("Unknown currency: {}", request.currency))?;
        if request.amount > balance.main {
            return Err(anyhow!("Insufficient balance"));
        }
        balance.main -= request.amount;
        self.withdrawals.lock().unwrap().push(request);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Prices, time and sleeping
// ---------------------------------------------------------------------------

/// Fixed USD prices; unknown symbols are unavailable.
#[derive(Default)]
pub struct FixedPrices {
    prices: HashMap<String, Decimal>,
}

impl FixedPrices {
    pub fn with(mut self, symbol: &str, usd: Decimal) -> Self {
        self.prices.insert(symbol.to_string(), usd);
        self
    }
}

#[async_trait]
impl PriceSource for FixedPrices {
    async fn usd_price(&self, symbol: &str) -> Result<Option<Decimal>> {
        Ok(self.prices.get(symbol).copied())
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Records every requested sleep and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn count(&self, duration: Duration) -> usize {
        self.recorded().iter().filter(|d| **d == duration).count()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn strategy(
    mode: BetMode,
    percentage: PercentageConfig,
    transfer: TransferConfig,
) -> StrategyConfig {
    StrategyConfig::new(mode, ProgressiveConfig::default(), percentage, transfer, 300).unwrap()
}

pub fn withdraw_to(address: &str, min_usd: Decimal) -> TransferConfig {
    TransferConfig {
        auto_withdraw: true,
        withdrawal_address: Some(address.to_string()),
        withdrawal_min_usd: min_usd,
        ..TransferConfig::default()
    }
}

/// Build a runner over `dice` with no claimer.
pub fn runner(
    dice: Arc<MockDice>,
    prices: FixedPrices,
    strategy: StrategyConfig,
    options: RunOptions,
) -> (Runner, Arc<RecordingSleeper>) {
    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()));
    let sleeper = Arc::new(RecordingSleeper::default());
    let valuator = Valuator::new(Arc::new(prices), clock, strategy.price_refresh_secs());
    let orchestrator = Orchestrator::new(dice, valuator, strategy);
    let runner = Runner::new(orchestrator, None, sleeper.clone(), options);
    (runner, sleeper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(stake: Decimal, use_faucet: bool) -> WagerRequest {
        WagerRequest {
            currency: "btc".to_string(),
            stake,
            win_chance: dec!(50),
            direction: Direction::High,
            use_faucet,
        }
    }

    #[tokio::test]
    async fn test_mock_scripted_win_and_default_loss() {
        let dice = MockDice::new(vec![CurrencyBalance::new("btc", dec!(1), Decimal::ZERO)]);
        dice.script(&[Roll::Win(dec!(2))]);

        let won = dice.submit_wager(request(dec!(0.5), false)).await.unwrap();
        assert!(won.won);
        assert_eq!(won.main_balance, dec!(1.5));
        assert_eq!(won.profit, dec!(0.5));

        let lost = dice.submit_wager(request(dec!(0.5), false)).await.unwrap();
        assert!(!lost.won);
        assert_eq!(lost.main_balance, dec!(1));
        assert_eq!(dice.wagers().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_rejects_overdraw() {
        let dice = MockDice::new(vec![CurrencyBalance::new("btc", dec!(1), dec!(0.1))]);
        assert!(dice.submit_wager(request(dec!(0.2), true)).await.is_err());
        assert!(dice.wagers().is_empty());
    }

    #[tokio::test]
    async fn test_mock_cashout_moves_faucet_to_main() {
        let dice = MockDice::new(vec![CurrencyBalance::new("btc", dec!(1), dec!(0.1))]);
        dice.cashout_faucet("btc").await.unwrap();
        assert_eq!(dice.balance("btc"), CurrencyBalance::new("btc", dec!(1.1), Decimal::ZERO));
    }
}
