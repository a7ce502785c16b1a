//! Betting engine: session state, USD valuation, pacing, the per-wager
//! orchestrator and the run loops built on top of it.

pub mod orchestrator;
pub mod pacing;
pub mod runner;
pub mod session;
pub mod valuation;
