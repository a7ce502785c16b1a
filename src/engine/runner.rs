//! Run loops.
//!
//! Everything above a single wager: a faucet pass over every currency, the
//! continuous pass loop, a percentage-mode session on one currency, and the
//! faucet claim sweep. Wagers are strictly sequential; operator cancellation
//! is only honoured between wagers and between passes, never mid-wager.

use rust_decimal::Decimal;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::orchestrator::{Orchestrator, WagerRecord};
use super::pacing::Sleeper;
use super::session::{SessionLimits, SessionState, SessionSummary, StopReason};
use crate::config::RunConfig;
use crate::error::WagerError;
use crate::platforms::FaucetClaimer;
use crate::strategy::progressive;
use crate::types::{find_balance, ClaimResult, FaucetHolding};

// ---------------------------------------------------------------------------
// Options and reports
// ---------------------------------------------------------------------------

/// Loop controls for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Pause between continuous passes.
    pub interval: Duration,
    pub max_iterations: Option<u64>,
    pub stop_on_cashout: bool,
    pub claim_before_pass: bool,
    pub inter_currency_delay: Duration,
    pub inter_bet_delay: Duration,
    /// Overrides the configured per-session bet cap.
    pub max_bets: Option<u32>,
}

impl RunOptions {
    pub fn from_config(run: &RunConfig) -> Self {
        Self {
            interval: Duration::from_secs(run.interval_secs),
            max_iterations: run.max_iterations,
            stop_on_cashout: run.stop_on_cashout,
            claim_before_pass: run.claim_before_pass,
            inter_currency_delay: Duration::from_millis(run.inter_currency_delay_ms),
            inter_bet_delay: Duration::from_millis(run.inter_bet_delay_ms),
            max_bets: run.max_bets,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

/// Result of one currency within a faucet pass.
#[derive(Debug)]
pub struct CurrencyOutcome {
    pub currency: String,
    pub result: Result<WagerRecord, WagerError>,
}

/// Everything a faucet pass did.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Faucet balances seen at the start of the pass.
    pub holdings: Vec<FaucetHolding>,
    pub outcomes: Vec<CurrencyOutcome>,
}

impl PassReport {
    pub fn rolled(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn wins(&self) -> usize {
        self.records().filter(|r| r.won()).count()
    }

    /// Whether any currency in the pass was cashed out successfully.
    pub fn cashed_out(&self) -> bool {
        self.records().any(|r| r.cashout.success)
    }

    fn records(&self) -> impl Iterator<Item = &WagerRecord> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

/// Why the continuous loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    MaxIterations,
    CashoutReached,
    Cancelled,
}

impl fmt::Display for RunEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEnd::MaxIterations => write!(f, "max iterations reached"),
            RunEnd::CashoutReached => write!(f, "cashout reached"),
            RunEnd::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Totals for a continuous run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub iterations: u64,
    pub wagers: usize,
    pub wins: usize,
    pub failures: usize,
    pub cashouts: usize,
    pub claims: usize,
    pub end: RunEnd,
}

/// Why a percentage session ended.
#[derive(Debug)]
pub enum SessionEnd {
    Stopped(StopReason),
    /// The main balance was withdrawn; nothing is left to bet with.
    Withdrawn,
    Failed(WagerError),
    NoBalance,
    Cancelled,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Stopped(reason) => write!(f, "{reason}"),
            SessionEnd::Withdrawn => write!(f, "balance withdrawn"),
            SessionEnd::Failed(e) => write!(f, "failed: {e}"),
            SessionEnd::NoBalance => write!(f, "no main balance"),
            SessionEnd::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of a percentage session.
#[derive(Debug)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub summary: SessionSummary,
    pub records: Vec<WagerRecord>,
    pub end: SessionEnd,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct Runner {
    orchestrator: Orchestrator,
    claimer: Option<Arc<dyn FaucetClaimer>>,
    sleeper: Arc<dyn Sleeper>,
    options: RunOptions,
}

impl Runner {
    pub fn new(
        orchestrator: Orchestrator,
        claimer: Option<Arc<dyn FaucetClaimer>>,
        sleeper: Arc<dyn Sleeper>,
        options: RunOptions,
    ) -> Self {
        Self {
            orchestrator,
            claimer,
            sleeper,
            options,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Roll every faucet balance once.
    ///
    /// Win-chance slots are assigned from the balances fetched at the start
    /// of the pass. A failing currency is recorded and the pass moves on; only
    /// the initial balance fetch can fail the whole pass.
    pub async fn run_single_pass(&mut self) -> Result<PassReport, WagerError> {
        let balances = self.orchestrator.balances().await?;
        let holdings = self.orchestrator.value_faucets(&balances).await;

        if holdings.is_empty() {
            info!("No faucet balances to roll");
            return Ok(PassReport::default());
        }

        let total_usd: Decimal = holdings.iter().map(|h| h.faucet_usd).sum();
        info!(
            currencies = holdings.len(),
            total_usd = format!("${:.4}", total_usd),
            "Faucet balances"
        );
        for holding in &holdings {
            info!("  {holding}");
        }

        let plan = progressive::plan_pass(self.orchestrator.config().progressive(), &balances);
        let mut outcomes = Vec::with_capacity(plan.len());

        for (i, roll) in plan.into_iter().enumerate() {
            if i > 0 {
                self.sleeper.sleep(self.options.inter_currency_delay).await;
            }

            let result = self
                .orchestrator
                .roll_faucet(&roll.currency, roll.directive)
                .await;
            if let Err(e) = &result {
                warn!(error = %e, "Skipping currency for this pass");
            }
            outcomes.push(CurrencyOutcome {
                currency: roll.currency,
                result,
            });
        }

        let report = PassReport { holdings, outcomes };
        info!(
            rolled = report.rolled(),
            wins = report.wins(),
            failed = report.failed(),
            cashout = report.cashed_out(),
            "Faucet pass complete"
        );
        Ok(report)
    }

    /// Roll one currency's faucet balance, at `win_chance` or the base chance.
    pub async fn roll_currency(
        &mut self,
        currency: &str,
        win_chance: Option<Decimal>,
    ) -> Result<WagerRecord, WagerError> {
        let balances = self.orchestrator.balances().await?;
        let faucet = find_balance(&balances, currency)
            .map(|b| b.faucet)
            .unwrap_or(Decimal::ZERO);
        if faucet <= Decimal::ZERO {
            return Err(WagerError::NoFaucetBalance {
                currency: currency.to_lowercase(),
            });
        }

        let mut directive = progressive::directive(self.orchestrator.config().progressive(), faucet, 1);
        if let Some(chance) = win_chance {
            directive.win_chance = chance;
        }
        self.orchestrator.roll_faucet(currency, directive).await
    }

    /// Repeat faucet passes until cancelled, a cashout lands (when
    /// `stop_on_cashout`), or `max_iterations` passes have run.
    pub async fn run_continuous<F>(&mut self, shutdown: F) -> RunReport
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let run_id = Uuid::new_v4();
        let mut report = RunReport {
            run_id,
            iterations: 0,
            wagers: 0,
            wins: 0,
            failures: 0,
            cashouts: 0,
            claims: 0,
            end: RunEnd::Cancelled,
        };

        info!(
            run = %run_id,
            interval_secs = self.options.interval.as_secs(),
            max_iterations = ?self.options.max_iterations,
            stop_on_cashout = self.options.stop_on_cashout,
            "Starting continuous faucet run"
        );

        report.end = loop {
            if cancel_requested(&mut shutdown).await {
                break RunEnd::Cancelled;
            }

            report.iterations += 1;
            info!(run = %run_id, iteration = report.iterations, "Starting faucet pass");

            if self.options.claim_before_pass {
                report.claims += self.claim_all().await.iter().filter(|c| c.success).count();
            }

            match self.run_single_pass().await {
                Ok(pass) => {
                    report.wagers += pass.rolled();
                    report.wins += pass.wins();
                    report.failures += pass.failed();
                    if pass.cashed_out() {
                        report.cashouts += 1;
                        if self.options.stop_on_cashout {
                            break RunEnd::CashoutReached;
                        }
                    }
                }
                Err(e) => {
                    warn!(run = %run_id, error = %e, "Faucet pass failed");
                    report.failures += 1;
                }
            }

            if let Some(max) = self.options.max_iterations {
                if report.iterations >= max {
                    break RunEnd::MaxIterations;
                }
            }

            info!(
                run = %run_id,
                secs = self.options.interval.as_secs(),
                "Waiting for next pass"
            );
            tokio::select! {
                biased;
                _ = &mut shutdown => break RunEnd::Cancelled,
                _ = self.sleeper.sleep(self.options.interval) => {}
            }
        };

        info!(
            run = %run_id,
            iterations = report.iterations,
            wagers = report.wagers,
            wins = report.wins,
            failures = report.failures,
            cashouts = report.cashouts,
            end = %report.end,
            "Continuous run finished"
        );
        report
    }

    /// Bet a percentage of `currency`'s main balance until a stop condition
    /// fires, a wager fails, the balance is withdrawn, or the operator stops.
    ///
    /// Fails only if the starting balance cannot be fetched.
    pub async fn run_normal_session<F>(
        &mut self,
        currency: &str,
        shutdown: F,
    ) -> Result<SessionReport, WagerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let balance = self.orchestrator.main_balance(currency).await?;
        let mut session = SessionState::new(currency, balance);
        let mut records = Vec::new();

        if balance <= Decimal::ZERO {
            warn!(currency = %session.currency(), "No main balance; not starting a session");
            return Ok(SessionReport {
                session_id: session.id(),
                summary: session.summary(),
                records,
                end: SessionEnd::NoBalance,
            });
        }

        let limits = SessionLimits::new(self.orchestrator.config().percentage(), self.options.max_bets);
        info!(
            session = %session.id(),
            currency = %session.currency(),
            balance = %balance,
            max_bets = limits.max_bets,
            stop_loss = format!("{}%", limits.stop_loss_percent),
            take_profit = format!("{}%", limits.take_profit_percent),
            "Starting percentage session"
        );

        let end = loop {
            if let Some(reason) = session.evaluate_stop(&limits) {
                info!(session = %session.id(), reason = %reason, "Session stop condition met");
                break SessionEnd::Stopped(reason);
            }

            if cancel_requested(&mut shutdown).await {
                break SessionEnd::Cancelled;
            }

            if session.bet_count() > 0 {
                self.sleeper.sleep(self.options.inter_bet_delay).await;
            }

            match self.orchestrator.roll_percentage(&mut session).await {
                Ok(record) => {
                    let withdrawn = record.withdrawal.success;
                    records.push(record);
                    if withdrawn {
                        break SessionEnd::Withdrawn;
                    }
                }
                Err(e) => {
                    warn!(session = %session.id(), error = %e, "Wager failed; ending session");
                    break SessionEnd::Failed(e);
                }
            }
        };

        let summary = session.summary();
        info!(
            session = %session.id(),
            end = %end,
            summary = %summary,
            "Session finished"
        );

        Ok(SessionReport {
            session_id: session.id(),
            summary,
            records,
            end,
        })
    }

    /// Claim every claimable faucet once. Failures are recorded per currency.
    pub async fn claim_all(&self) -> Vec<ClaimResult> {
        let Some(claimer) = &self.claimer else {
            return Vec::new();
        };

        let currencies = match claimer.claimable_currencies().await {
            Ok(currencies) => currencies,
            Err(e) => {
                warn!(error = %e, "Could not list claimable faucets");
                return Vec::new();
            }
        };

        let mut results = Vec::with_capacity(currencies.len());
        for (i, currency) in currencies.iter().enumerate() {
            if i > 0 {
                self.sleeper.sleep(self.options.inter_currency_delay).await;
            }
            let result = match claimer.claim(currency).await {
                Ok(amount) => {
                    info!(currency = %currency, amount = %amount, "Faucet claimed");
                    ClaimResult::claimed(currency, amount)
                }
                Err(e) => {
                    warn!(currency = %currency, error = %e, "Faucet claim failed");
                    ClaimResult::failed(currency, format!("{e:#}"))
                }
            };
            results.push(result);
        }

        info!(
            attempted = results.len(),
            claimed = results.iter().filter(|r| r.success).count(),
            "Claim sweep complete"
        );
        results
    }
}

/// Non-blocking check of the shutdown future.
async fn cancel_requested<S>(shutdown: &mut S) -> bool
where
    S: Future<Output = ()> + Unpin,
{
    tokio::select! {
        biased;
        _ = shutdown => true,
        _ = std::future::ready(()) => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
