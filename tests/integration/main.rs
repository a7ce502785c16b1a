//! Integration tests: the runner driven end to end against an in-memory
//! dice site.

mod faucet_pass;
mod mock_dice;
