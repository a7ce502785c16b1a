//! Clock and sleep abstractions.
//!
//! All waiting in the bot (request cooldown, inter-currency delay, pause
//! between passes) goes through [`Sleeper`], and all "what time is it"
//! questions go through [`Clock`], so tests can run a full pass without
//! touching the wall clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Something that can wait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real waiting via the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Request pacer
// ---------------------------------------------------------------------------

/// Enforces a minimum gap between outbound requests.
pub struct RequestPacer {
    min_interval: Duration,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    last_request: Mutex<Option<DateTime<Utc>>>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            min_interval,
            clock,
            sleeper,
            last_request: Mutex::new(None),
        }
    }

    /// How long the next request has to wait, if at all.
    pub fn pending_wait(&self) -> Option<Duration> {
        let last = *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let elapsed = (self.clock.now() - last?).to_std().unwrap_or(Duration::ZERO);
        self.min_interval
            .checked_sub(elapsed)
            .filter(|wait| !wait.is_zero())
    }

    /// Wait out the cooldown, then mark a request as sent.
    pub async fn wait_turn(&self) {
        if let Some(wait) = self.pending_wait() {
            debug!(wait_ms = wait.as_millis() as u64, "Request cooldown");
            self.sleeper.sleep(wait).await;
        }
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(self.clock.now());
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------
