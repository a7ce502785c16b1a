//! DuckDice bot API integration.
//!
//! API docs: https://duckdice.io/bot-api
//! Base URL: https://duckdice.io/api
//! Auth: `api_key` query parameter on every request.
//! Rate limit: enforced client-side with a minimum gap between requests.
//!
//! Amounts are exchanged as decimal strings. Some fields come back as JSON
//! numbers depending on the endpoint, so they are parsed leniently.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::DiceApi;
use crate::config::ApiConfig;
use crate::engine::pacing::{Clock, RequestPacer, Sleeper};
use crate::types::{CurrencyBalance, WagerOutcome, WagerRequest, WithdrawalRequest};

// ---------------------------------------------------------------------------
// API request/response types (DuckDice JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    balances: Vec<Option<RawBalance>>,
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    #[serde(default)]
    currency: String,
    #[serde(default)]
    main: Value,
    #[serde(default)]
    faucet: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayRequest<'a> {
    symbol: &'a str,
    amount: String,
    chance: String,
    is_high: bool,
    faucet: bool,
}

/// Response from `POST dice/play`.
#[derive(Debug, Deserialize)]
struct PlayResponse {
    #[serde(default)]
    bet: PlacedBet,
    #[serde(default)]
    user: Option<UserInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct PlacedBet {
    /// True on a win.
    #[serde(default)]
    result: bool,
    #[serde(default)]
    profit: Value,
    #[serde(default)]
    number: Value,
}

#[derive(Debug, Serialize)]
struct CashoutRequest<'a> {
    symbol: &'a str,
}

#[derive(Debug, Serialize)]
struct WithdrawRequest<'a> {
    symbol: &'a str,
    address: &'a str,
    amount: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// DuckDice REST client with built-in request pacing.
pub struct DuckDiceClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    pacer: RequestPacer,
}

impl DuckDiceClient {
    pub fn new(
        config: &ApiConfig,
        api_key: SecretString,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("DICEBOT/0.1.0")
            .build()
            .context("Failed to build HTTP client for DuckDice")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            pacer: RequestPacer::new(Duration::from_millis(config.request_delay_ms), clock, sleeper),
        })
    }

    // -- Internal helpers ------------------------------------------------

    async fn request<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T> {
        self.pacer.wait_turn().await;

        let url = format!("{}/{endpoint}", self.base_url);
        debug!(%method, endpoint, "DuckDice request");

        let mut req = self
            .http
            .request(method, &url)
            .query(&[("api_key", self.api_key.expose_secret().as_str())]);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("DuckDice request to {endpoint} failed"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("DuckDice API error {status} on {endpoint}: {body}");
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse DuckDice {endpoint} response"))
    }

    fn to_balances(info: UserInfo) -> Vec<CurrencyBalance> {
        info.balances
            .into_iter()
            .flatten()
            .filter(|b| !b.currency.is_empty())
            .map(|b| CurrencyBalance::new(&b.currency, to_decimal(&b.main), to_decimal(&b.faucet)))
            .collect()
    }

    /// Turn a play response into an outcome, reading post-bet balances for
    /// `currency` from the embedded user info. A response without balances
    /// for `currency` is an error: the post-bet balance is unknown.
    fn to_outcome(resp: PlayResponse, currency: &str) -> Result<WagerOutcome> {
        let balances = resp.user.map(Self::to_balances).unwrap_or_default();
        let balance = crate::types::find_balance(&balances, currency).with_context(|| {
            format!("DuckDice play response carries no {currency} balance")
        })?;

        Ok(WagerOutcome {
            won: resp.bet.result,
            profit: to_decimal(&resp.bet.profit),
            roll_number: resp.bet.number.as_u64().unwrap_or(0),
            main_balance: balance.main,
            faucet_balance: balance.faucet,
        })
    }
}

/// Lenient decimal parsing: strings or numbers; anything else is zero.
fn to_decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .unwrap_or(Decimal::ZERO),
        Value::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .unwrap_or(Decimal::ZERO)
        }
        _ => Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// DiceApi trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl DiceApi for DuckDiceClient {
    async fn balances(&self) -> Result<Vec<CurrencyBalance>> {
        let info: UserInfo = self
            .request::<(), _>(Method::GET, "bot/user-info", None)
            .await?;
        Ok(Self::to_balances(info))
    }

    async fn submit_wager(&self, request: WagerRequest) -> Result<WagerOutcome> {
        let body = PlayRequest {
            symbol: &request.currency,
            amount: request.stake.normalize().to_string(),
            chance: request.win_chance.normalize().to_string(),
            is_high: request.direction.is_high(),
            faucet: request.use_faucet,
        };
        let resp: PlayResponse = self.request(Method::POST, "dice/play", Some(&body)).await?;
        Self::to_outcome(resp, &request.currency)
    }

    async fn cashout_faucet(&self, currency: &str) -> Result<()> {
        let body = CashoutRequest { symbol: currency };
        let _: Value = self
            .request(Method::POST, "faucet/cashout", Some(&body))
            .await?;
        Ok(())
    }

    async fn withdraw(&self, request: WithdrawalRequest) -> Result<()> {
        let body = WithdrawRequest {
            symbol: &request.currency,
            address: &request.address,
            amount: request.amount.normalize().to_string(),
        };
        let _: Value = self.request(Method::POST, "withdraw", Some(&body)).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
