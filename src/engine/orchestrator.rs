//! Wager orchestrator.
//!
//! Drives one wager end to end: take a directive, submit it, fold the
//! outcome into session state, value the resulting balance, and fire any
//! cashout/withdrawal the configured USD thresholds call for.
//!
//! A failed submission aborts the wager and is returned to the caller.
//! Failed transfers never do: they are logged, marked on the record, and
//! the wager stands.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::StrategyConfig;
use crate::engine::session::SessionState;
use crate::engine::valuation::Valuator;
use crate::error::WagerError;
use crate::platforms::DiceApi;
use crate::strategy::{percentage, BetDirective};
use crate::types::{
    find_balance, CurrencyBalance, FaucetHolding, TransferStatus, WagerOutcome, WagerRequest,
    WithdrawalRequest,
};

/// Currency label used when a failure is not tied to one currency.
const ALL_CURRENCIES: &str = "all";

// ---------------------------------------------------------------------------
// Wager record
// ---------------------------------------------------------------------------

/// Everything that happened for one wager.
#[derive(Debug, Clone, PartialEq)]
pub struct WagerRecord {
    pub currency: String,
    pub directive: BetDirective,
    pub outcome: WagerOutcome,
    /// USD value of the balance the wager was played from, after the wager.
    pub usd_value: Decimal,
    pub cashout: TransferStatus,
    pub withdrawal: TransferStatus,
}

impl WagerRecord {
    pub fn won(&self) -> bool {
        self.outcome.won
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    api: Arc<dyn DiceApi>,
    valuator: Valuator,
    config: StrategyConfig,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn DiceApi>, valuator: Valuator, config: StrategyConfig) -> Self {
        Self {
            api,
            valuator,
            config,
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn valuator(&self) -> &Valuator {
        &self.valuator
    }

    /// All balances on the account.
    pub async fn balances(&self) -> Result<Vec<CurrencyBalance>, WagerError> {
        self.api.balances().await.map_err(|e| WagerError::Balance {
            currency: ALL_CURRENCIES.to_string(),
            reason: format!("{e:#}"),
        })
    }

    /// Main balance of one currency; zero if the account does not hold it.
    pub async fn main_balance(&self, currency: &str) -> Result<Decimal, WagerError> {
        let balances = self.api.balances().await.map_err(|e| WagerError::Balance {
            currency: currency.to_lowercase(),
            reason: format!("{e:#}"),
        })?;
        Ok(find_balance(&balances, currency)
            .map(|b| b.main)
            .unwrap_or(Decimal::ZERO))
    }

    /// Currencies with a faucet balance, valued in USD.
    pub async fn faucet_overview(&mut self) -> Result<Vec<FaucetHolding>, WagerError> {
        let balances = self.balances().await?;
        Ok(self.value_faucets(&balances).await)
    }

    /// Value the faucet balances of an already-fetched balance listing.
    pub async fn value_faucets(&mut self, balances: &[CurrencyBalance]) -> Vec<FaucetHolding> {
        let mut holdings = Vec::new();
        for b in balances.iter().filter(|b| b.has_faucet()) {
            let faucet_usd = self.valuator.usd_value(b.faucet, &b.currency).await;
            holdings.push(FaucetHolding {
                currency: b.currency.clone(),
                faucet_balance: b.faucet,
                main_balance: b.main,
                faucet_usd,
            });
        }
        holdings
    }

    /// Roll a faucet balance all-in, then cash out / withdraw if the
    /// thresholds are met.
    pub async fn roll_faucet(
        &mut self,
        currency: &str,
        directive: BetDirective,
    ) -> Result<WagerRecord, WagerError> {
        let currency = currency.to_lowercase();
        if directive.stake <= Decimal::ZERO {
            return Err(WagerError::NoFaucetBalance { currency });
        }

        info!(
            currency = %currency,
            stake = %directive.stake,
            win_chance = %directive.win_chance,
            direction = %directive.direction,
            strategy = %directive.tag,
            "Rolling faucet balance"
        );

        let outcome = self.submit(&currency, &directive, true).await?;
        let usd_value = self.valuator.usd_value(outcome.faucet_balance, &currency).await;

        info!(
            currency = %currency,
            result = %outcome,
            faucet_balance = %outcome.faucet_balance,
            usd = format!("${:.2}", usd_value),
            "Faucet roll settled"
        );

        let mut record = WagerRecord {
            currency: currency.clone(),
            directive,
            outcome,
            usd_value,
            cashout: TransferStatus::skipped(),
            withdrawal: TransferStatus::skipped(),
        };

        let threshold = self.config.transfer().cashout_min_usd;
        if record.outcome.faucet_balance > Decimal::ZERO && usd_value >= threshold {
            info!(
                currency = %currency,
                threshold = format!("${threshold}"),
                "Faucet balance over cashout threshold"
            );
            record.cashout = self.cashout(&currency).await;
            if record.cashout.success {
                record.withdrawal = self.withdraw_after_cashout(&currency).await;
            }
        }

        Ok(record)
    }

    /// Place the next percentage-mode wager of `session`.
    pub async fn roll_percentage(
        &mut self,
        session: &mut SessionState,
    ) -> Result<WagerRecord, WagerError> {
        let currency = session.currency().to_string();
        let directive = percentage::select(&self.config, session);
        if directive.stake <= Decimal::ZERO {
            return Err(WagerError::ZeroStake { currency });
        }

        info!(
            session = %session.id(),
            currency = %currency,
            bet = session.bet_count() + 1,
            strategy = %directive.tag,
            stake = %directive.stake,
            win_chance = %directive.win_chance,
            direction = %directive.direction,
            "Placing wager"
        );

        let outcome = self.submit(&currency, &directive, false).await?;
        session.record(&directive, &outcome);
        let usd_value = self
            .valuator
            .usd_value(session.current_balance(), &currency)
            .await;

        info!(
            session = %session.id(),
            currency = %currency,
            result = %outcome,
            balance = %session.current_balance(),
            usd = format!("${:.2}", usd_value),
            wins = session.win_count(),
            losses = session.loss_count(),
            total_profit = %session.total_profit(),
            "Wager settled"
        );

        let mut record = WagerRecord {
            currency: currency.clone(),
            directive,
            outcome,
            usd_value,
            cashout: TransferStatus::skipped(),
            withdrawal: TransferStatus::skipped(),
        };

        let transfer = self.config.transfer();
        if let Some(address) = transfer.withdrawal_target().map(str::to_string) {
            if usd_value >= transfer.withdrawal_min_usd {
                record.withdrawal = self
                    .withdraw(&currency, &address, session.current_balance())
                    .await;
            }
        }

        Ok(record)
    }

    // -- Internal helpers ------------------------------------------------

    async fn submit(
        &self,
        currency: &str,
        directive: &BetDirective,
        use_faucet: bool,
    ) -> Result<WagerOutcome, WagerError> {
        let request = WagerRequest {
            currency: currency.to_string(),
            stake: directive.stake,
            win_chance: directive.win_chance,
            direction: directive.direction,
            use_faucet,
        };
        self.api
            .submit_wager(request)
            .await
            .map_err(|e| {
                warn!(currency, error = %e, "Wager submission failed");
                WagerError::Submit {
                    currency: currency.to_string(),
                    reason: format!("{e:#}"),
                }
            })
    }

    async fn cashout(&self, currency: &str) -> TransferStatus {
        match self.api.cashout_faucet(currency).await {
            Ok(()) => {
                info!(currency, "Cashout successful");
                TransferStatus::attempted(true)
            }
            Err(e) => {
                warn!(currency, error = %e, "Cashout failed");
                TransferStatus::attempted(false)
            }
        }
    }

    /// After a cashout, withdraw the whole main balance if it is worth
    /// enough. The balance is re-fetched since the cashout just changed it.
    async fn withdraw_after_cashout(&mut self, currency: &str) -> TransferStatus {
        let Some(address) = self.config.transfer().withdrawal_target().map(str::to_string) else {
            return TransferStatus::skipped();
        };

        let main = match self.main_balance(currency).await {
            Ok(main) => main,
            Err(e) => {
                warn!(currency, error = %e, "Could not re-fetch main balance for withdrawal");
                return TransferStatus::skipped();
            }
        };

        let main_usd = self.valuator.usd_value(main, currency).await;
        let threshold = self.config.transfer().withdrawal_min_usd;
        if main > Decimal::ZERO && main_usd >= threshold {
            info!(
                currency,
                main_usd = format!("${:.2}", main_usd),
                threshold = format!("${threshold}"),
                "Main balance over withdrawal threshold"
            );
            self.withdraw(currency, &address, main).await
        } else {
            TransferStatus::skipped()
        }
    }

    async fn withdraw(&self, currency: &str, address: &str, amount: Decimal) -> TransferStatus {
        let request = WithdrawalRequest {
            currency: currency.to_string(),
            address: address.to_string(),
            amount,
        };
        match self.api.withdraw(request).await {
            Ok(()) => {
                info!(currency, amount = %amount, "Withdrawal initiated");
                TransferStatus::attempted(true)
            }
            Err(e) => {
                warn!(currency, amount = %amount, error = %e, "Withdrawal failed");
                TransferStatus::attempted(false)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
