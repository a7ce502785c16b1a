//! Price data providers.
//!
//! Defines the `PriceSource` trait used for USD valuation and provides a
//! CoinGecko implementation.

pub mod coingecko;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Abstraction over spot-price lookups.
///
/// `Ok(None)` means the source answered but has no usable price for the
/// symbol; `Err` means the lookup itself failed. Callers treat both as
/// "unavailable".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// USD price of one unit of `symbol` (lower-case currency symbol).
    async fn usd_price(&self, symbol: &str) -> Result<Option<Decimal>>;
}
