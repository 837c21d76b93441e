//! Price feed implementation.
//!
//! Pools read prices through the [`PriceFeed`] trait. The engine ships a
//! [`ManualPriceFeed`] whose prices are pushed by a maintainer, which is what
//! tests, simulations and the CLI use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::utils::crypto::Address;
use crate::utils::math::FixedPoint;

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE DATA
// ═══════════════════════════════════════════════════════════════════════════════

/// A single price data point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceData {
    /// Price of one synthetic unit in collateral units, 18 decimals
    pub price: FixedPoint,
    /// Time the price was recorded
    pub timestamp: u64,
}

impl PriceData {
    /// Create a new price data point
    pub fn new(price: FixedPoint, timestamp: u64) -> Self {
        Self { price, timestamp }
    }

    /// Get age of price in seconds
    pub fn age(&self, current_time: u64) -> u64 {
        current_time.saturating_sub(self.timestamp)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE FEED INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of prices keyed by identifier (e.g. `"EUR/USD"`)
pub trait PriceFeed: Debug + Send + Sync {
    /// Whether the identifier has a price
    fn is_price_supported(&self, identifier: &str) -> bool;

    /// Latest price for the identifier
    fn get_latest_price(&self, identifier: &str) -> Result<PriceData>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// MANUAL PRICE FEED
// ═══════════════════════════════════════════════════════════════════════════════

/// Price feed whose prices are set explicitly by its maintainer
#[derive(Debug)]
pub struct ManualPriceFeed {
    maintainer: Address,
    prices: RwLock<BTreeMap<String, PriceData>>,
}

impl ManualPriceFeed {
    /// Create an empty feed
    pub fn new(maintainer: Address) -> Self {
        Self {
            maintainer,
            prices: RwLock::new(BTreeMap::new()),
        }
    }

    /// Publish a price
    pub fn set_price(
        &self,
        sender: Address,
        identifier: &str,
        price: FixedPoint,
        timestamp: u64,
    ) -> Result<()> {
        if sender != self.maintainer {
            return Err(Error::SenderMustBeMaintainer);
        }
        if price.is_zero() {
            return Err(Error::InvalidParameter {
                name: "price".into(),
                reason: "cannot be zero".into(),
            });
        }
        let mut prices = self
            .prices
            .write()
            .map_err(|_| Error::Internal("price feed lock poisoned".into()))?;
        tracing::debug!(identifier, price = %price, "price updated");
        prices.insert(identifier.to_string(), PriceData::new(price, timestamp));
        Ok(())
    }

    /// All identifiers with a price
    pub fn identifiers(&self) -> Vec<String> {
        self.prices
            .read()
            .map(|prices| prices.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl PriceFeed for ManualPriceFeed {
    fn is_price_supported(&self, identifier: &str) -> bool {
        self.prices
            .read()
            .map(|prices| prices.contains_key(identifier))
            .unwrap_or(false)
    }

    fn get_latest_price(&self, identifier: &str) -> Result<PriceData> {
        let prices = self
            .prices
            .read()
            .map_err(|_| Error::Internal("price feed lock poisoned".into()))?;
        prices
            .get(identifier)
            .copied()
            .ok_or_else(|| Error::UnsupportedPriceIdentifier(identifier.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_feed() {
        let maintainer = Address::derive("maintainer");
        let feed = ManualPriceFeed::new(maintainer);
        let price: FixedPoint = "1.2".parse().unwrap();

        assert!(!feed.is_price_supported("EUR/USD"));
        feed.set_price(maintainer, "EUR/USD", price, 10).unwrap();
        assert!(feed.is_price_supported("EUR/USD"));
        assert_eq!(feed.get_latest_price("EUR/USD").unwrap().price, price);
        assert_eq!(feed.get_latest_price("EUR/USD").unwrap().age(15), 5);
        assert_eq!(feed.identifiers(), vec!["EUR/USD".to_string()]);
    }

    #[test]
    fn test_rejects_outsiders_and_zero() {
        let maintainer = Address::derive("maintainer");
        let feed = ManualPriceFeed::new(maintainer);
        assert_eq!(
            feed.set_price(Address::derive("x"), "EUR/USD", FixedPoint::ONE, 0),
            Err(Error::SenderMustBeMaintainer)
        );
        assert!(feed.set_price(maintainer, "EUR/USD", FixedPoint::ZERO, 0).is_err());
        assert!(matches!(
            feed.get_latest_price("GBP/USD"),
            Err(Error::UnsupportedPriceIdentifier(_))
        ));
    }
}
