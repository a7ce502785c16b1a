//! DICEBOT: faucet and percentage-of-balance dice betting engine.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod platforms;
pub mod strategy;
pub mod types;
