//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has defaults, so a partial (or empty) file is valid. A handful of
//! environment variables override file values, and secrets are referenced
//! by env-var name and resolved at runtime.
//!
//! The betting engine never sees `AppConfig` directly: `AppConfig::strategy`
//! validates the relevant sections into an immutable [`StrategyConfig`].

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::types::{BetMode, Direction};

/// Env var consulted for the config file path.
pub const CONFIG_PATH_ENV: &str = "DICEBOT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";
/// Longest accepted price refresh interval (one day).
pub const MAX_PRICE_REFRESH_SECS: u64 = 86_400;

// ---------------------------------------------------------------------------
// File sections
// ---------------------------------------------------------------------------

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub faucet: ProgressiveConfig,
    pub normal: PercentageConfig,
    pub transfer: TransferConfig,
    pub pricing: PricingConfig,
    pub run: RunConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Name of the env var holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Minimum gap between outbound requests.
    pub request_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://duckdice.io/api".to_string(),
            api_key_env: "DUCKDICE_API_KEY".to_string(),
            timeout_secs: 30,
            request_delay_ms: 1000,
        }
    }
}

/// Faucet mode: all-in rolls, win chance rising per processed currency.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProgressiveConfig {
    /// Win chance (%) for the first currency of a pass.
    pub base_win_chance: Decimal,
    /// Added to the win chance for every further currency.
    pub win_chance_increment: Decimal,
    pub bet_high: bool,
}

impl Default for ProgressiveConfig {
    fn default() -> Self {
        Self {
            base_win_chance: dec!(0.01),
            win_chance_increment: dec!(0.01),
            bet_high: true,
        }
    }
}

/// Normal mode: stake a percentage of the main balance.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PercentageConfig {
    pub low_risk_win_chance: Decimal,
    pub low_risk_bet_percent: Decimal,
    pub high_risk_win_chance: Decimal,
    pub high_risk_bet_percent: Decimal,
    /// Every Nth wager is high-risk; 0 disables.
    pub high_risk_frequency: u32,
    pub alternate_direction: bool,
    pub max_bets_per_session: u32,
    pub stop_loss_percent: Decimal,
    pub take_profit_percent: Decimal,
}

impl Default for PercentageConfig {
    fn default() -> Self {
        Self {
            low_risk_win_chance: dec!(49.5),
            low_risk_bet_percent: dec!(5),
            high_risk_win_chance: dec!(12),
            high_risk_bet_percent: dec!(1),
            high_risk_frequency: 5,
            alternate_direction: true,
            max_bets_per_session: 50,
            stop_loss_percent: dec!(50),
            take_profit_percent: dec!(50),
        }
    }
}

impl PercentageConfig {
    /// The smaller of the two bet percentages.
    pub fn min_bet_percent(&self) -> Decimal {
        self.low_risk_bet_percent.min(self.high_risk_bet_percent)
    }
}

/// USD thresholds for moving value out of the betting balances.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TransferConfig {
    pub cashout_min_usd: Decimal,
    pub auto_withdraw: bool,
    pub withdrawal_address: Option<String>,
    pub withdrawal_min_usd: Decimal,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            cashout_min_usd: dec!(20),
            auto_withdraw: false,
            withdrawal_address: None,
            withdrawal_min_usd: dec!(20),
        }
    }
}

impl TransferConfig {
    /// Destination for automatic withdrawals, if they are enabled.
    pub fn withdrawal_target(&self) -> Option<&str> {
        if !self.auto_withdraw {
            return None;
        }
        self.withdrawal_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PricingConfig {
    pub price_refresh_secs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price_refresh_secs: 300,
        }
    }
}

/// What the binary does when started.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Faucet passes or a normal-mode session, depending on `mode`.
    #[default]
    Run,
    /// Roll a single currency's faucet balance.
    Roll,
    /// Print faucet balances and exit.
    Status,
    /// Run one faucet claim sweep.
    Claim,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunConfig {
    pub command: Command,
    pub mode: BetMode,
    /// Currency for normal-mode sessions and single rolls.
    pub currency: Option<String>,
    /// Win chance override for single rolls.
    pub roll_win_chance: Option<Decimal>,
    pub continuous: bool,
    pub interval_secs: u64,
    pub max_iterations: Option<u64>,
    pub stop_on_cashout: bool,
    pub claim_before_pass: bool,
    pub inter_currency_delay_ms: u64,
    pub inter_bet_delay_ms: u64,
    /// Overrides `normal.max_bets_per_session` for this run.
    pub max_bets: Option<u32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            command: Command::Run,
            mode: BetMode::Faucet,
            currency: None,
            roll_win_chance: None,
            continuous: false,
            interval_secs: 60,
            max_iterations: None,
            stop_on_cashout: false,
            claim_before_pass: true,
            inter_currency_delay_ms: 1000,
            inter_bet_delay_ms: 500,
            max_bets: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Validated strategy configuration
// ---------------------------------------------------------------------------

/// Immutable, validated parameters for the betting engine.
///
/// Built once per run; all range checks happen here so that nothing is
/// discovered halfway through a session.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    mode: BetMode,
    progressive: ProgressiveConfig,
    percentage: PercentageConfig,
    transfer: TransferConfig,
    price_refresh_secs: u64,
}

impl StrategyConfig {
    pub fn new(
        mode: BetMode,
        progressive: ProgressiveConfig,
        percentage: PercentageConfig,
        transfer: TransferConfig,
        price_refresh_secs: u64,
    ) -> Result<Self, ConfigError> {
        check_win_chance("base_win_chance", progressive.base_win_chance)?;
        check_non_negative("win_chance_increment", progressive.win_chance_increment)?;

        check_win_chance("low_risk_win_chance", percentage.low_risk_win_chance)?;
        check_win_chance("high_risk_win_chance", percentage.high_risk_win_chance)?;
        check_percent("low_risk_bet_percent", percentage.low_risk_bet_percent)?;
        check_percent("high_risk_bet_percent", percentage.high_risk_bet_percent)?;
        check_non_negative("stop_loss_percent", percentage.stop_loss_percent)?;
        check_non_negative("take_profit_percent", percentage.take_profit_percent)?;

        check_non_negative("cashout_min_usd", transfer.cashout_min_usd)?;
        check_non_negative("withdrawal_min_usd", transfer.withdrawal_min_usd)?;
        if transfer.auto_withdraw && transfer.withdrawal_target().is_none() {
            return Err(ConfigError::MissingWithdrawalAddress);
        }

        if price_refresh_secs == 0 {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        if price_refresh_secs > MAX_PRICE_REFRESH_SECS {
            return Err(ConfigError::OutOfRange {
                field: "price_refresh_secs",
                value: Decimal::from(price_refresh_secs),
                min: Decimal::ONE,
                max: Decimal::from(MAX_PRICE_REFRESH_SECS),
            });
        }

        Ok(Self {
            mode,
            progressive,
            percentage,
            transfer,
            price_refresh_secs,
        })
    }

    pub fn mode(&self) -> BetMode {
        self.mode
    }

    pub fn progressive(&self) -> &ProgressiveConfig {
        &self.progressive
    }

    pub fn percentage(&self) -> &PercentageConfig {
        &self.percentage
    }

    pub fn transfer(&self) -> &TransferConfig {
        &self.transfer
    }

    pub fn price_refresh_secs(&self) -> u64 {
        self.price_refresh_secs
    }

    /// Direction used whenever alternation is off.
    pub fn default_direction(&self) -> Direction {
        Direction::from_high(self.progressive.bet_high)
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            mode: BetMode::Faucet,
            progressive: ProgressiveConfig::default(),
            percentage: PercentageConfig::default(),
            transfer: TransferConfig::default(),
            price_refresh_secs: PricingConfig::default().price_refresh_secs,
        }
    }
}

fn check_win_chance(field: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value <= Decimal::ZERO || value >= Decimal::ONE_HUNDRED {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min: Decimal::ZERO,
            max: Decimal::ONE_HUNDRED,
        });
    }
    Ok(())
}

fn check_percent(field: &'static str, value: Decimal) -> Result<(), ConfigError> {
    check_non_negative(field, value)?;
    if value > Decimal::ONE_HUNDRED {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min: Decimal::ZERO,
            max: Decimal::ONE_HUNDRED,
        });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value < Decimal::ZERO {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Path of the config file: `$DICEBOT_CONFIG` or `config.toml`.
    pub fn default_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Values that fail to parse leave the file value in place.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("DUCKDICE_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.api.base_url = v;
        }
        if let Some(v) = lookup("REQUEST_DELAY_MS").and_then(|v| v.trim().parse().ok()) {
            self.api.request_delay_ms = v;
        }
        if let Some(v) = lookup("FAUCET_BASE_WIN_CHANCE").and_then(|v| parse_decimal(&v)) {
            self.faucet.base_win_chance = v;
        }
        if let Some(v) = lookup("FAUCET_WIN_CHANCE_INCREMENT").and_then(|v| parse_decimal(&v)) {
            self.faucet.win_chance_increment = v;
        }
        if let Some(v) = lookup("FAUCET_CASHOUT_MIN_USD").and_then(|v| parse_decimal(&v)) {
            self.transfer.cashout_min_usd = v;
        }
        if let Some(v) = lookup("AUTO_WITHDRAW") {
            self.transfer.auto_withdraw = parse_bool(&v);
        }
        if let Some(v) = lookup("WITHDRAWAL_ADDRESS") {
            self.transfer.withdrawal_address = Some(v);
        }
        if let Some(v) = lookup("WITHDRAWAL_MIN_USD").and_then(|v| parse_decimal(&v)) {
            self.transfer.withdrawal_min_usd = v;
        }
    }

    /// Validate and extract the engine configuration.
    pub fn strategy(&self) -> Result<StrategyConfig, ConfigError> {
        StrategyConfig::new(
            self.run.mode,
            self.faucet.clone(),
            self.normal.clone(),
            self.transfer.clone(),
            self.pricing.price_refresh_secs,
        )
    }

    /// Resolve the API key from the env var named in `[api]`.
    pub fn api_key(&self) -> Result<SecretString> {
        Self::resolve_env(&self.api.api_key_env).map(SecretString::new)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

fn parse_decimal(value: &str) -> Option<Decimal> {
    Decimal::from_str(value.trim()).ok()
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
