//! CoinGecko spot prices.
//!
//! API: `https://api.coingecko.com/api/v3/simple/price?ids={id}&vs_currencies=usd`
//! Auth: none for the public tier.
//! Rate limit: roughly 10–30 req/min on the free tier, which is why the
//! valuation layer caches prices.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::PriceSource;

const BASE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// Dice-site currency symbols mapped to CoinGecko coin ids.
/// Symbols not listed are looked up under their own (lower-case) name.
const COIN_IDS: &[(&str, &str)] = &[
    ("btc", "bitcoin"),
    ("eth", "ethereum"),
    ("ltc", "litecoin"),
    ("doge", "dogecoin"),
    ("xrp", "ripple"),
    ("trx", "tron"),
    ("bnb", "binancecoin"),
    ("usdt", "tether"),
    ("usdc", "usd-coin"),
    ("sol", "solana"),
    ("ada", "cardano"),
    ("dot", "polkadot"),
    ("matic", "matic-network"),
    ("shib", "shiba-inu"),
    ("avax", "avalanche-2"),
    ("link", "chainlink"),
    ("xlm", "stellar"),
    ("atom", "cosmos"),
    ("etc", "ethereum-classic"),
    ("bch", "bitcoin-cash"),
    ("xmr", "monero"),
    ("dash", "dash"),
    ("zec", "zcash"),
    ("neo", "neo"),
    ("eos", "eos"),
];

/// One coin's quotes. The price is read from the JSON number text, never
/// through a float.
#[derive(Debug, Deserialize)]
struct UsdQuote {
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    usd: Option<Decimal>,
}

/// `{"bitcoin": {"usd": 50000.0}}`
type SimplePriceResponse = HashMap<String, UsdQuote>;

pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("DICEBOT/0.1.0")
            .build()
            .context("Failed to build CoinGecko HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// CoinGecko coin id for a dice-site symbol.
    pub fn coin_id(symbol: &str) -> String {
        let symbol = symbol.to_lowercase();
        COIN_IDS
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, id)| id.to_string())
            .unwrap_or(symbol)
    }

    /// Pull the USD price for `coin_id` out of a `simple/price` response.
    /// Zero or missing prices count as unavailable.
    fn extract_price(response: &SimplePriceResponse, coin_id: &str) -> Option<Decimal> {
        response
            .get(coin_id)
            .and_then(|quote| quote.usd)
            .filter(|p| p.is_sign_positive() && !p.is_zero())
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn usd_price(&self, symbol: &str) -> Result<Option<Decimal>> {
        let coin_id = Self::coin_id(symbol);
        let url = format!(
            "{}?ids={}&vs_currencies=usd",
            self.base_url,
            urlencoding::encode(&coin_id),
        );

        debug!(symbol, coin_id = %coin_id, "Fetching CoinGecko price");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("CoinGecko request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("CoinGecko API error {status}: {body}");
        }

        let data: SimplePriceResponse = resp
            .json()
            .await
            .context("Failed to parse CoinGecko simple/price response")?;

        Ok(Self::extract_price(&data, &coin_id))
    }
}
