//! Liquidation and emergency settlement for synthpool.
//!
//! This module sizes the two ways a position is wound down:
//! - Partial liquidation of an undercollateralized position
//! - Pro-rata settlement after an emergency shutdown

pub mod engine;
pub mod settlement;

pub use engine::*;
pub use settlement::*;
