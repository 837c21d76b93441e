//! Price oracle interface.
//!
//! Pools only depend on [`PriceFeed`]; aggregation and sourcing of prices is
//! outside the engine.

pub mod price_feed;

pub use price_feed::{ManualPriceFeed, PriceData, PriceFeed};
