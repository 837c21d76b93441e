//! Shared execution context.
//!
//! Everything a pool operation reads or writes outside its own ledger lives
//! here: the registry, the price feed, token balances, the lending layer and
//! the event log. The orchestrator clones the whole context before each
//! operation and restores it on failure.

use std::sync::Arc;

use crate::core::config::ProtocolConfig;
use crate::core::registry::{Registry, RegistryKey};
use crate::core::token::TokenLedger;
use crate::error::Result;
use crate::lending::manager::{LendingEnv, LendingManager};
use crate::lending::market::MarketRegistry;
use crate::lending::storage::LendingStorageManager;
use crate::oracle::price_feed::{PriceData, PriceFeed};
use crate::protocol::events::{Event, EventLog};
use crate::utils::crypto::Address;

/// Execution context shared by every pool
#[derive(Debug, Clone)]
pub struct Context {
    /// Engine time in seconds
    pub now: u64,
    /// Chain id bound into signatures
    pub chain_id: u64,
    /// Service locator
    pub registry: Registry,
    /// Price source
    pub price_feed: Arc<dyn PriceFeed>,
    /// Token balances
    pub tokens: TokenLedger,
    /// Lending proxy
    pub lending: LendingManager,
    /// Lending storage manager
    pub lending_storage: LendingStorageManager,
    /// Money markets behind the lending modules
    pub markets: MarketRegistry,
    /// Emitted events
    pub events: EventLog,
}

impl Context {
    /// Create a context with empty ledgers
    pub fn new(
        config: &ProtocolConfig,
        registry: Registry,
        price_feed: Arc<dyn PriceFeed>,
        lending: LendingManager,
        lending_storage: LendingStorageManager,
    ) -> Self {
        Self {
            now: 0,
            chain_id: config.chain_id,
            registry,
            price_feed,
            tokens: TokenLedger::new(),
            lending,
            lending_storage,
            markets: MarketRegistry::new(),
            events: EventLog::new(config.max_events),
        }
    }

    /// Split the context into the proxy and the state it drives
    pub fn lending_env(&mut self) -> (&LendingManager, LendingEnv<'_>) {
        let Self {
            now,
            registry,
            tokens,
            lending,
            lending_storage,
            markets,
            events,
            ..
        } = self;
        (
            lending,
            LendingEnv {
                storage: lending_storage,
                markets,
                tokens,
                registry,
                events,
                now: *now,
            },
        )
    }

    /// Latest price for an identifier; requires a registered price feed
    pub fn latest_price(&self, identifier: &str) -> Result<PriceData> {
        self.registry.get(RegistryKey::PriceFeed)?;
        self.price_feed.get_latest_price(identifier)
    }

    /// Record an event at the current time
    pub fn emit(&mut self, emitter: Address, event: Event) {
        self.events.push(emitter, self.now, event);
    }
}
