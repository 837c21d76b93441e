//! Synthetic pools.
//!
//! This module contains:
//! - The pool ledger: balances, fee credits and pure mint/redeem planning
//! - The pool state machine driving tokens, lending and events

pub mod ledger;
pub mod pool;

pub use ledger::*;
pub use pool::*;
