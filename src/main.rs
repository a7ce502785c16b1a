//! DICEBOT: faucet and percentage-of-balance dice betting engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the DuckDice and CoinGecko clients into the engine, and runs the
//! configured command with Ctrl+C handling between wagers.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use dicebot::config::{self, AppConfig, Command};
use dicebot::data::coingecko::CoinGeckoClient;
use dicebot::engine::orchestrator::Orchestrator;
use dicebot::engine::pacing::{Clock, Sleeper, SystemClock, TokioSleeper};
use dicebot::engine::runner::{PassReport, RunOptions, Runner};
use dicebot::engine::valuation::Valuator;
use dicebot::platforms::duckdice::DuckDiceClient;
use dicebot::types::BetMode;

const BANNER: &str = r#"
 ____ ___ ____ _____ ____   ___ _____
|  _ \_ _/ ___| ____| __ ) / _ \_   _|
| | | | | |   |  _| |  _ \| | | || |
| |_| | | |___| |___| |_) | |_| || |
|____/___\____|_____|____/ \___/ |_|

  Faucet & percentage dice betting engine
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML; a missing file means all defaults
    let path = AppConfig::default_path();
    let mut cfg = if Path::new(&path).exists() {
        AppConfig::load(&path)?
    } else {
        AppConfig::default()
    };
    cfg.apply_env_overrides();

    init_logging();

    println!("{BANNER}");
    info!(
        config = %path,
        command = ?cfg.run.command,
        mode = %cfg.run.mode,
        base_url = %cfg.api.base_url,
        "DICEBOT starting up"
    );

    // -- Initialise components -------------------------------------------

    let strategy = cfg.strategy().context("Invalid strategy configuration")?;
    let api_key = cfg.api_key()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

    let dice = DuckDiceClient::new(&cfg.api, api_key, clock.clone(), sleeper.clone())?;
    let prices = CoinGeckoClient::new()?;
    let valuator = Valuator::new(Arc::new(prices), clock, strategy.price_refresh_secs());
    let orchestrator = Orchestrator::new(Arc::new(dice), valuator, strategy);

    // Faucet claiming needs a browser session; no claimer is wired in.
    let mut runner = Runner::new(orchestrator, None, sleeper, RunOptions::from_config(&cfg.run));

    // -- Dispatch --------------------------------------------------------

    let mode = runner.orchestrator().config().mode();
    match cfg.run.command {
        Command::Status => {
            let holdings = runner.orchestrator_mut().faucet_overview().await?;
            if holdings.is_empty() {
                info!("No faucet balances");
            }
            for holding in &holdings {
                info!("{holding}");
            }
        }
        Command::Claim => {
            let results = runner.claim_all().await;
            if results.is_empty() {
                warn!("No faucet claimer configured; nothing claimed");
            }
        }
        Command::Roll => {
            let currency = require_currency(&cfg)?;
            let record = runner.roll_currency(&currency, cfg.run.roll_win_chance).await?;
            info!(
                currency = %record.currency,
                result = %record.outcome,
                usd = format!("${:.4}", record.usd_value),
                cashout = record.cashout.success,
                "Roll complete"
            );
        }
        Command::Run => match mode {
            BetMode::Faucet if cfg.run.continuous => {
                info!("Entering continuous mode. Press Ctrl+C to stop.");
                runner.run_continuous(shutdown_signal()).await;
            }
            BetMode::Faucet => {
                let report = runner.run_single_pass().await?;
                log_pass_failures(&report);
            }
            BetMode::Normal => {
                let currency = require_currency(&cfg)?;
                info!("Starting percentage session. Press Ctrl+C to stop.");
                let report = runner.run_normal_session(&currency, shutdown_signal()).await?;
                println!("{}", report.summary);
            }
        },
    }

    info!("DICEBOT shut down cleanly.");
    Ok(())
}

fn require_currency(cfg: &config::AppConfig) -> Result<String> {
    cfg.run
        .currency
        .clone()
        .filter(|c| !c.trim().is_empty())
        .context("run.currency must be set for this command")
}

fn log_pass_failures(report: &PassReport) {
    for outcome in &report.outcomes {
        if let Err(e) = &outcome.result {
            warn!(currency = %outcome.currency, error = %e, "Currency failed this pass");
        }
    }
}

/// Resolves on Ctrl+C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dicebot=info"));

    let json_logging = std::env::var("DICEBOT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
