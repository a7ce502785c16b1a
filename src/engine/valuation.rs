//! USD valuation with a time-based price cache.
//!
//! Prices are refreshed lazily: a lookup only hits the price source when the
//! cached entry is missing or stale. A failed refresh falls back to the last
//! known price, or zero if there never was one. Valuation never fails the
//! caller.
//!
//! The cache is owned by the `Valuator` and only touched from the betting
//! task, so it needs no locking.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::data::PriceSource;
use crate::engine::pacing::Clock;

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct CachedPrice {
    usd: Decimal,
    fetched_at: DateTime<Utc>,
}

/// Currency symbol → last fetched USD price.
#[derive(Debug, Clone)]
pub struct PriceCache {
    entries: HashMap<String, CachedPrice>,
    refresh_interval: Duration,
}

impl PriceCache {
    /// Intervals too large for a `Duration` saturate to `Duration::MAX`.
    pub fn new(refresh_interval_secs: u64) -> Self {
        let refresh_interval = i64::try_from(refresh_interval_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self {
            entries: HashMap::new(),
            refresh_interval,
        }
    }

    /// An entry is stale once `now - fetched_at >= refresh_interval`.
    /// Missing entries are stale.
    pub fn is_stale(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        match self.entries.get(&key(symbol)) {
            Some(entry) => now - entry.fetched_at >= self.refresh_interval,
            None => true,
        }
    }

    /// The cached price if it is still fresh.
    pub fn fresh(&self, symbol: &str, now: DateTime<Utc>) -> Option<Decimal> {
        if self.is_stale(symbol, now) {
            return None;
        }
        self.last_known(symbol)
    }

    /// The cached price regardless of age.
    pub fn last_known(&self, symbol: &str) -> Option<Decimal> {
        self.entries.get(&key(symbol)).map(|e| e.usd)
    }

    pub fn store(&mut self, symbol: &str, usd: Decimal, now: DateTime<Utc>) {
        self.entries.insert(
            key(symbol),
            CachedPrice {
                usd,
                fetched_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn key(symbol: &str) -> String {
    symbol.to_lowercase()
}

// ---------------------------------------------------------------------------
// Valuator
// ---------------------------------------------------------------------------

/// Converts currency amounts to USD through a cached price source.
pub struct Valuator {
    source: Arc<dyn PriceSource>,
    clock: Arc<dyn Clock>,
    cache: PriceCache,
}

impl Valuator {
    pub fn new(source: Arc<dyn PriceSource>, clock: Arc<dyn Clock>, refresh_interval_secs: u64) -> Self {
        Self {
            source,
            clock,
            cache: PriceCache::new(refresh_interval_secs),
        }
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// USD price of one unit of `symbol`. Zero when no price is known.
    pub async fn usd_price(&mut self, symbol: &str) -> Decimal {
        let now = self.clock.now();
        if let Some(price) = self.cache.fresh(symbol, now) {
            debug!(symbol, price = %price, "Price cache hit");
            return price;
        }

        match self.source.usd_price(&key(symbol)).await {
            Ok(Some(price)) if price > Decimal::ZERO => {
                self.cache.store(symbol, price, now);
                debug!(symbol, price = %price, "Price refreshed");
                return price;
            }
            Ok(_) => warn!(symbol, "No USD price available"),
            Err(e) => warn!(symbol, error = %e, "Failed to fetch USD price"),
        }

        self.cache.last_known(symbol).unwrap_or(Decimal::ZERO)
    }

    /// USD value of `amount` units of `symbol`.
    pub async fn usd_value(&mut self, amount: Decimal, symbol: &str) -> Decimal {
        if amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        amount * self.usd_price(symbol).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
