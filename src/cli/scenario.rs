//! Scenario runner behind `synthpool simulate`.
//!
//! A scenario is a JSON document describing the world (tokens, markets,
//! lending modules, prices, pools) followed by steps run in order against a
//! fresh [`Protocol`]. Before parsing, every string of the form `"@label"`
//! is replaced by the address derived from `label`, so documents can name
//! accounts instead of spelling out hex.
//!
//! Setup failures abort the run. Step failures are recorded in the report
//! and the run continues with the next step.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::core::config::{PoolConfig, ProtocolConfig};
use crate::core::context::Context;
use crate::core::registry::{Registry, RegistryKey};
use crate::error::{Error, Result};
use crate::forwarder::eip712::ForwardRequest;
use crate::lending::manager::{LendingManager, LendingRoles};
use crate::lending::market::{MarketKind, MoneyMarket};
use crate::lending::module::LendingModuleKind;
use crate::lending::storage::LendingStorageManager;
use crate::oracle::price_feed::ManualPriceFeed;
use crate::pool::pool::PositionInfo;
use crate::protocol::events::EventRecord;
use crate::protocol::operations::PoolCall;
use crate::protocol::state_machine::Protocol;
use crate::utils::crypto::{Address, PrivateKey};
use crate::utils::math::FixedPoint;

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Replace `"@label"` strings with derived addresses, recursively
pub fn resolve_labels(value: &mut Value) {
    match value {
        Value::String(s) => {
            if let Some(label) = s.strip_prefix('@') {
                *s = Address::derive(label).to_hex();
            }
        }
        Value::Array(items) => items.iter_mut().for_each(resolve_labels),
        Value::Object(map) => map.values_mut().for_each(resolve_labels),
        _ => {}
    }
}

/// Token created before the first step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSpec {
    /// Token address
    pub address: Address,
    /// Display name
    pub name: String,
    /// Ticker
    pub symbol: String,
    /// Decimals
    pub decimals: u8,
    /// Admin allowed to grant minter rights
    #[serde(default)]
    pub admin: Address,
    /// Whether anyone may mint
    #[serde(default)]
    pub faucet: bool,
}

/// Money market created before the first step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSpec {
    /// Interest-bearing token address
    pub address: Address,
    /// Ticker of the interest-bearing token
    pub symbol: String,
    /// Underlying token
    pub underlying: Address,
    /// Market flavour
    pub kind: MarketKind,
    /// Initial exchange rate for exchange-rate markets
    #[serde(default)]
    pub exchange_rate: Option<FixedPoint>,
}

/// Pool deployed before the first step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSpec {
    /// Pool address
    pub address: Address,
    /// Deployment config
    pub config: PoolConfig,
}

/// One scenario step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Mint faucet tokens
    Faucet {
        /// Faucet token
        token: Address,
        /// Receiver
        to: Address,
        /// Amount in the token's smallest unit
        amount: u128,
    },
    /// Publish a price
    SetPrice {
        /// Price identifier
        identifier: String,
        /// New price
        price: FixedPoint,
    },
    /// Accrue interest on a market
    Accrue {
        /// Interest-bearing token of the market
        market: Address,
        /// Growth rate applied once
        rate: FixedPoint,
    },
    /// Move the engine clock forward
    AdvanceTime {
        /// Seconds to add
        seconds: u64,
    },
    /// Call a pool directly
    Call {
        /// Caller
        sender: Address,
        /// Target pool
        pool: Address,
        /// Operation
        call: PoolCall,
    },
    /// Sign a call and relay it through the forwarder
    Relay {
        /// Hex private key of the signer
        key: String,
        /// Target pool
        pool: Address,
        /// Operation
        call: PoolCall,
        /// Signed gas limit
        #[serde(default)]
        gas: u128,
    },
}

impl Step {
    /// Short name of the step
    pub fn action(&self) -> &'static str {
        match self {
            Step::Faucet { .. } => "faucet",
            Step::SetPrice { .. } => "set_price",
            Step::Accrue { .. } => "accrue",
            Step::AdvanceTime { .. } => "advance_time",
            Step::Call { .. } => "call",
            Step::Relay { .. } => "relay",
        }
    }
}

/// A complete scenario document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Engine settings
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Engine time at start
    #[serde(default)]
    pub start_time: u64,
    /// Registry, price feed and lending maintainer
    pub maintainer: Address,
    /// Account allowed to deploy pools
    pub pool_factory: Address,
    /// Account allowed to shut pools down
    #[serde(default)]
    pub manager: Option<Address>,
    /// Receiver of commission claims
    #[serde(default)]
    pub commission_receiver: Option<Address>,
    /// Receiver of buyback proceeds
    #[serde(default)]
    pub buyback_receiver: Option<Address>,
    /// Whether the forwarder is registered as trusted
    #[serde(default = "default_true")]
    pub trust_forwarder: bool,
    /// Tokens
    pub tokens: Vec<TokenSpec>,
    /// Money markets
    #[serde(default)]
    pub markets: Vec<MarketSpec>,
    /// Lending modules by id
    #[serde(default)]
    pub modules: BTreeMap<String, LendingModuleKind>,
    /// Initial prices
    #[serde(default)]
    pub prices: BTreeMap<String, FixedPoint>,
    /// Pools
    pub pools: Vec<PoolSpec>,
    /// Steps
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_true() -> bool {
    true
}

impl Scenario {
    /// Parse a scenario document
    pub fn from_json(json: &str) -> Result<Self> {
        let mut value: Value = serde_json::from_str(json)?;
        resolve_labels(&mut value);
        Ok(serde_json::from_value(value)?)
    }

    /// Load a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::Config(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Build the world described by the document
    pub fn build(&self) -> Result<Simulation> {
        let registry_address = Address::derive("registry");
        let proxy_address = Address::derive("lending-proxy");
        let storage_address = Address::derive("lending-storage");
        let feed_address = Address::derive("price-feed");
        let forwarder_address = Address::derive("forwarder");

        let mut registry = Registry::new(registry_address, self.maintainer);
        let mut bindings = vec![
            (RegistryKey::PoolFactory, Some(self.pool_factory)),
            (RegistryKey::LendingProxy, Some(proxy_address)),
            (RegistryKey::LendingStorageManager, Some(storage_address)),
            (RegistryKey::PriceFeed, Some(feed_address)),
            (RegistryKey::Manager, self.manager),
            (RegistryKey::CommissionReceiver, self.commission_receiver),
            (RegistryKey::BuybackProgramReceiver, self.buyback_receiver),
        ];
        if self.trust_forwarder {
            bindings.push((RegistryKey::TrustedForwarder, Some(forwarder_address)));
        }
        for (key, address) in bindings {
            if let Some(address) = address {
                registry.change_implementation_address(self.maintainer, key, address)?;
            }
        }

        let feed = Arc::new(ManualPriceFeed::new(self.maintainer));
        for (identifier, price) in &self.prices {
            feed.set_price(self.maintainer, identifier, *price, self.start_time)?;
        }

        let mut proxy = LendingManager::new(
            proxy_address,
            LendingRoles {
                admin: self.maintainer,
                maintainer: self.maintainer,
            },
        );
        for (id, module) in &self.modules {
            proxy.set_lending_module(self.maintainer, id, module.clone())?;
        }

        let mut ctx = Context::new(
            &self.protocol,
            registry,
            feed.clone(),
            proxy,
            LendingStorageManager::new(storage_address),
        );
        ctx.now = self.start_time;
        for token in &self.tokens {
            ctx.tokens.create_token(
                token.address,
                &token.name,
                &token.symbol,
                token.decimals,
                token.admin,
                token.faucet,
            )?;
        }
        for spec in &self.markets {
            let mut market = MoneyMarket::new(spec.address, &spec.symbol, spec.underlying, spec.kind);
            if let Some(rate) = spec.exchange_rate {
                market = market.with_exchange_rate(rate);
            }
            ctx.markets.insert(market)?;
        }

        let mut protocol = Protocol::new(&self.protocol, ctx, forwarder_address)?;
        for pool in &self.pools {
            pool.config.validate()?;
            protocol.deploy_pool(self.pool_factory, pool.address, pool.config.clone())?;
        }

        Ok(Simulation {
            protocol,
            feed,
            maintainer: self.maintainer,
        })
    }

    /// Build the world and run every step
    pub fn run(&self) -> Result<Report> {
        let mut simulation = self.build()?;
        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| simulation.record(index, step))
            .collect();
        Ok(simulation.report(steps))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIMULATION
// ═══════════════════════════════════════════════════════════════════════════════

/// A built scenario world
#[derive(Debug)]
pub struct Simulation {
    protocol: Protocol,
    feed: Arc<ManualPriceFeed>,
    maintainer: Address,
}

impl Simulation {
    /// The engine
    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Run one step, returning its result as JSON
    pub fn apply(&mut self, step: &Step) -> Result<Value> {
        match step {
            Step::Faucet { token, to, amount } => {
                self.protocol.faucet(token, *to, *amount)?;
                Ok(Value::Null)
            }
            Step::SetPrice { identifier, price } => {
                let now = self.protocol.ctx().now;
                self.feed.set_price(self.maintainer, identifier, *price, now)?;
                Ok(Value::Null)
            }
            Step::Accrue { market, rate } => {
                let interest = self.protocol.accrue_market(market, *rate)?;
                Ok(serde_json::json!({ "interest": interest.to_string() }))
            }
            Step::AdvanceTime { seconds } => {
                self.protocol.advance_time(*seconds);
                Ok(Value::Null)
            }
            Step::Call { sender, pool, call } => {
                let outcome = self.protocol.execute(*sender, *pool, call.clone())?;
                Ok(serde_json::to_value(outcome)?)
            }
            Step::Relay {
                key,
                pool,
                call,
                gas,
            } => {
                let key = PrivateKey::from_hex(key)?;
                let forwarder = self.protocol.forwarder();
                let request = ForwardRequest {
                    from: key.address(),
                    to: *pool,
                    value: 0,
                    gas: *gas,
                    nonce: forwarder.get_nonce(&key.address()),
                    data: call.encode(),
                };
                let signature = forwarder.sign(&key, &request);
                let output = self.protocol.safe_execute(&request, &signature)?;
                Ok(serde_json::json!({
                    "from": request.from,
                    "nonce": request.nonce.to_string(),
                    "output": format!("0x{}", hex::encode(output)),
                }))
            }
        }
    }

    fn record(&mut self, index: usize, step: &Step) -> StepReport {
        match self.apply(step) {
            Ok(result) => StepReport {
                index,
                action: step.action().to_string(),
                ok: true,
                result,
                error: None,
            },
            Err(err) => {
                tracing::warn!(index, action = step.action(), error = %err, "step failed");
                StepReport {
                    index,
                    action: step.action().to_string(),
                    ok: false,
                    result: Value::Null,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Snapshot the engine into a report
    pub fn report(&self, steps: Vec<StepReport>) -> Report {
        let positions = self
            .protocol
            .pool_addresses()
            .into_iter()
            .filter_map(|pool| {
                self.protocol
                    .position_info(&pool)
                    .ok()
                    .map(|info| (pool, info))
            })
            .collect();
        Report {
            steps,
            positions,
            events: self.protocol.events().records().to_vec(),
        }
    }
}

/// Outcome of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// Position in the scenario
    pub index: usize,
    /// Step name
    pub action: String,
    /// Whether the step succeeded
    pub ok: bool,
    /// Step result
    pub result: Value,
    /// Error message of a failed step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Per-step outcomes
    pub steps: Vec<StepReport>,
    /// Final position of every pool with a price
    pub positions: BTreeMap<Address, PositionInfo>,
    /// Emitted events, oldest first
    pub events: Vec<EventRecord>,
}

impl Report {
    /// Number of failed steps
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = include_str!("../../scenarios/basic.json");

    #[test]
    fn test_labels_resolve_to_derived_addresses() {
        let mut value = serde_json::json!({ "a": "@user", "b": ["@pool", "plain"], "c": 1 });
        resolve_labels(&mut value);
        assert_eq!(value["a"], Address::derive("user").to_hex());
        assert_eq!(value["b"][0], Address::derive("pool").to_hex());
        assert_eq!(value["b"][1], "plain");
        assert_eq!(value["c"], 1);
    }

    #[test]
    fn test_basic_scenario_runs() {
        let scenario = Scenario::from_json(BASIC).unwrap();
        let report = scenario.run().unwrap();
        assert_eq!(report.failures(), 1);
        let failed = report.steps.iter().find(|s| !s.ok).unwrap();
        assert_eq!(failed.action, "call");

        let pool = Address::derive("pool");
        let info = report.positions.get(&pool).unwrap();
        assert!(info.total_synthetic_tokens > 0);
        assert!(report.events.iter().any(|r| r.event.event_type() == "Mint"));
        assert!(report
            .events
            .iter()
            .any(|r| r.event.event_type() == "MetaTransactionExecuted"));
    }

    #[test]
    fn test_setup_failure_aborts() {
        let mut value: Value = serde_json::from_str(BASIC).unwrap();
        value["pools"][0]["config"]["price_identifier"] = "XAU/USD".into();
        let scenario = Scenario::from_json(&value.to_string()).unwrap();
        assert!(matches!(
            scenario.run(),
            Err(Error::UnsupportedPriceIdentifier(_))
        ));
    }
}
