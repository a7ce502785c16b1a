//! Faucet-mode passes end to end: progressive win chances, per-currency
//! failure isolation, cashout and withdrawal thresholds, and the
//! continuous loop's exit conditions.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

use dicebot::config::{PercentageConfig, TransferConfig};
use dicebot::engine::runner::{RunEnd, RunOptions};
use dicebot::error::WagerError;
use dicebot::strategy::StrategyTag;
use dicebot::types::*;

use crate::mock_dice::{runner, strategy, withdraw_to, FixedPrices, MockDice, Roll};

fn faucet_strategy(transfer: TransferConfig) -> dicebot::config::StrategyConfig {
    strategy(BetMode::Faucet, PercentageConfig::default(), transfer)
}

fn prices() -> FixedPrices {
    FixedPrices::default()
        .with("btc", dec!(50000))
        .with("eth", dec!(2500))
        .with("doge", dec!(0.1))
}

#[tokio::test]
async fn test_progressive_chances_skip_empty_faucets() {
    let dice = MockDice::new(vec![
        CurrencyBalance::new("btc", Decimal::ZERO, dec!(0.0000001)),
        CurrencyBalance::new("eth", dec!(0.5), Decimal::ZERO),
        CurrencyBalance::new("doge", Decimal::ZERO, dec!(3)),
        CurrencyBalance::new("ltc", Decimal::ZERO, dec!(0.001)),
    ]);
    let (mut runner, sleeper) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(TransferConfig::default()),
        RunOptions::default(),
    );

    let report = runner.run_single_pass().await.unwrap();

    let chances: Vec<Decimal> = dice.wagers().iter().map(|w| w.win_chance).collect();
    assert_eq!(chances, vec![dec!(0.01), dec!(0.02), dec!(0.03)]);
    assert!(dice.wagers().iter().all(|w| w.use_faucet && w.direction == Direction::High));
    assert_eq!(dice.wagers()[1].stake, dec!(3));

    assert_eq!(report.rolled(), 3);
    assert_eq!(report.holdings.len(), 3);
    let slots: Vec<StrategyTag> = report
        .outcomes
        .iter()
        .map(|o| o.result.as_ref().unwrap().directive.tag)
        .collect();
    assert_eq!(
        slots,
        vec![
            StrategyTag::Progressive { slot: 1 },
            StrategyTag::Progressive { slot: 2 },
            StrategyTag::Progressive { slot: 3 },
        ]
    );
    assert_eq!(sleeper.count(Duration::from_millis(1000)), 2);
}

#[tokio::test]
async fn test_failing_currency_does_not_stop_pass() {
    let dice = MockDice::new(vec![
        CurrencyBalance::new("btc", Decimal::ZERO, dec!(0.0000001)),
        CurrencyBalance::new("doge", Decimal::ZERO, dec!(3)),
        CurrencyBalance::new("ltc", Decimal::ZERO, dec!(0.001)),
    ]);
    dice.fail_currency("doge");
    let (mut runner, _) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(TransferConfig::default()),
        RunOptions::default(),
    );

    let report = runner.run_single_pass().await.unwrap();

    assert_eq!(report.rolled(), 2);
    assert_eq!(report.failed(), 1);
    let failed = report.outcomes.iter().find(|o| o.result.is_err()).unwrap();
    assert_eq!(failed.currency, "doge");
    let err = failed.result.as_ref().unwrap_err();
    assert!(matches!(err, WagerError::Submit { .. }));
    assert_eq!(err.currency(), "doge");

    // ltc keeps slot 3 even though doge failed.
    assert_eq!(dice.wagers().last().unwrap().win_chance, dec!(0.03));
}

#[tokio::test]
async fn test_win_over_threshold_cashes_out() {
    let dice = MockDice::new(vec![CurrencyBalance::new("btc", Decimal::ZERO, dec!(0.0000001))]);
    // 0.0000001 * 20000 = 0.002 BTC = $100
    dice.script(&[Roll::Win(dec!(20000))]);
    let (mut runner, _) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(TransferConfig::default()),
        RunOptions::default(),
    );

    let report = runner.run_single_pass().await.unwrap();
    let record = report.outcomes[0].result.as_ref().unwrap();

    assert!(record.won());
    assert_eq!(record.usd_value, dec!(100));
    assert_eq!(record.cashout, TransferStatus::attempted(true));
    assert_eq!(record.withdrawal, TransferStatus::skipped());
    assert!(report.cashed_out());
    assert_eq!(dice.cashouts(), vec!["btc".to_string()]);
    assert_eq!(dice.balance("btc"), CurrencyBalance::new("btc", dec!(0.002), Decimal::ZERO));
}

#[tokio::test]
async fn test_win_under_threshold_keeps_faucet() {
    let dice = MockDice::new(vec![CurrencyBalance::new("btc", Decimal::ZERO, dec!(0.0000001))]);
    // 0.0000001 * 2000 = 0.0002 BTC = $10
    dice.script(&[Roll::Win(dec!(2000))]);
    let (mut runner, _) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(TransferConfig::default()),
        RunOptions::default(),
    );

    let report = runner.run_single_pass().await.unwrap();
    let record = report.outcomes[0].result.as_ref().unwrap();

    assert_eq!(record.usd_value, dec!(10));
    assert!(!record.cashout.triggered);
    assert!(dice.cashouts().is_empty());
}

#[tokio::test]
async fn test_missing_price_values_at_zero_and_still_rolls() {
    let dice = MockDice::new(vec![CurrencyBalance::new("xmr", Decimal::ZERO, dec!(0.01))]);
    dice.script(&[Roll::Win(dec!(100))]);
    let (mut runner, _) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(TransferConfig::default()),
        RunOptions::default(),
    );

    let report = runner.run_single_pass().await.unwrap();
    let record = report.outcomes[0].result.as_ref().unwrap();

    assert!(record.won());
    assert_eq!(record.usd_value, Decimal::ZERO);
    assert!(!record.cashout.triggered);
}

#[tokio::test]
async fn test_cashout_then_withdraws_main_balance() {
    let dice = MockDice::new(vec![CurrencyBalance::new("btc", dec!(0.001), dec!(0.0000001))]);
    dice.script(&[Roll::Win(dec!(20000))]);
    let (mut runner, _) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(withdraw_to("bc1qcold", dec!(20))),
        RunOptions::default(),
    );

    let report = runner.run_single_pass().await.unwrap();
    let record = report.outcomes[0].result.as_ref().unwrap();

    assert!(record.cashout.success);
    assert!(record.withdrawal.success);
    let withdrawals = dice.withdrawals();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].address, "bc1qcold");
    assert_eq!(withdrawals[0].amount, dec!(0.003));
    assert_eq!(dice.balance("btc").main, Decimal::ZERO);
}

#[tokio::test]
async fn test_failed_cashout_is_recorded_and_pass_continues() {
    let dice = MockDice::new(vec![
        CurrencyBalance::new("btc", Decimal::ZERO, dec!(0.0000001)),
        CurrencyBalance::new("doge", Decimal::ZERO, dec!(3)),
    ]);
    dice.script(&[Roll::Win(dec!(20000))]);
    dice.fail_cashouts();
    let (mut runner, _) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(withdraw_to("bc1qcold", dec!(20))),
        RunOptions::default(),
    );

    let report = runner.run_single_pass().await.unwrap();
    let btc = report.outcomes[0].result.as_ref().unwrap();

    assert!(btc.cashout.failed());
    assert!(!btc.withdrawal.triggered);
    assert!(!report.cashed_out());
    assert_eq!(report.rolled(), 2);
    // The win itself stands.
    assert_eq!(dice.balance("btc").faucet, dec!(0.002));
}

#[tokio::test]
async fn test_failed_withdrawal_is_recorded() {
    let dice = MockDice::new(vec![CurrencyBalance::new("btc", Decimal::ZERO, dec!(0.0000001))]);
    dice.script(&[Roll::Win(dec!(20000))]);
    dice.fail_withdrawals();
    let (mut runner, _) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(withdraw_to("bc1qcold", dec!(20))),
        RunOptions::default(),
    );

    let report = runner.run_single_pass().await.unwrap();
    let record = report.outcomes[0].result.as_ref().unwrap();

    assert!(record.cashout.success);
    assert!(record.withdrawal.failed());
    assert_eq!(dice.balance("btc").main, dec!(0.002));
}

#[tokio::test]
async fn test_roll_single_currency() {
    let dice = MockDice::new(vec![
        CurrencyBalance::new("btc", Decimal::ZERO, dec!(0.0000001)),
        CurrencyBalance::new("doge", Decimal::ZERO, dec!(3)),
    ]);
    let (mut runner, _) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(TransferConfig::default()),
        RunOptions::default(),
    );

    runner.roll_currency("DOGE", None).await.unwrap();
    let wagers = dice.wagers();
    assert_eq!(wagers.len(), 1);
    assert_eq!(wagers[0].currency, "doge");
    assert_eq!(wagers[0].win_chance, dec!(0.01));

    let err = runner.roll_currency("eth", None).await.unwrap_err();
    assert!(matches!(err, WagerError::NoFaucetBalance { .. }));
}

// ---------------------------------------------------------------------------
// Continuous mode
// ---------------------------------------------------------------------------

fn continuous(max_iterations: Option<u64>, stop_on_cashout: bool) -> RunOptions {
    RunOptions {
        interval: Duration::from_secs(60),
        max_iterations,
        stop_on_cashout,
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn test_continuous_stops_after_max_iterations() {
    let dice = MockDice::new(vec![CurrencyBalance::new("doge", Decimal::ZERO, dec!(3))]);
    let (mut runner, sleeper) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(TransferConfig::default()),
        continuous(Some(3), false),
    );

    let report = runner.run_continuous(std::future::pending()).await;

    assert_eq!(report.end, RunEnd::MaxIterations);
    assert_eq!(report.iterations, 3);
    // Only the first pass had a faucet balance to lose.
    assert_eq!(report.wagers, 1);
    assert_eq!(report.wins, 0);
    assert_eq!(sleeper.count(Duration::from_secs(60)), 2);
}

#[tokio::test]
async fn test_continuous_stops_on_cashout() {
    let dice = MockDice::new(vec![CurrencyBalance::new("btc", Decimal::ZERO, dec!(0.0000001))]);
    dice.script(&[Roll::Win(dec!(20000))]);
    let (mut runner, sleeper) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(TransferConfig::default()),
        continuous(None, true),
    );

    let report = runner.run_continuous(std::future::pending()).await;

    assert_eq!(report.end, RunEnd::CashoutReached);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.cashouts, 1);
    assert_eq!(sleeper.count(Duration::from_secs(60)), 0);
}

#[tokio::test]
async fn test_continuous_cancelled_between_passes() {
    let dice = MockDice::new(vec![CurrencyBalance::new("doge", Decimal::ZERO, dec!(3))]);
    let (mut runner, sleeper) = runner(
        dice.clone(),
        prices(),
        faucet_strategy(TransferConfig::default()),
        continuous(None, false),
    );

    // Operator presses Ctrl+C while the loop waits after the first pass.
    let watcher = sleeper.clone();
    let shutdown = async move {
        while watcher.recorded().is_empty() {
            tokio::task::yield_now().await;
        }
    };

    let report = runner.run_continuous(shutdown).await;

    assert_eq!(report.end, RunEnd::Cancelled);
    assert_eq!(report.iterations, 1);
    assert_eq!(dice.wagers().len(), 1);
}
