//! Engine and pool configuration.
//!
//! Parameters are divided into:
//! - Pool parameters: economic knobs a maintainer can change later
//! - Pool config: everything fixed at pool deployment
//! - Protocol config: engine-wide settings, loadable from JSON and the
//!   environment

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::fees::FeeConfig;
use crate::error::{Error, Result};
use crate::utils::constants::*;
use crate::utils::crypto::Address;
use crate::utils::math::FixedPoint;
use crate::utils::validation::*;

// ═══════════════════════════════════════════════════════════════════════════════
// POOL PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Economic parameters of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Extra collateral the LP locks per unit of user collateral
    pub over_collateralization: FixedPoint,

    /// Minimum collateral/value ratio below which a position is liquidatable
    pub collateral_requirement: FixedPoint,

    /// Share of the liquidated surplus paid to the liquidator
    pub liquidation_reward: FixedPoint,

    /// Fee percentage and recipients
    pub fee: FeeConfig,
}

impl PoolParams {
    /// Set the over-collateralization
    pub fn with_over_collateralization(mut self, value: FixedPoint) -> Self {
        self.over_collateralization = value;
        self
    }

    /// Set the collateral requirement
    pub fn with_collateral_requirement(mut self, value: FixedPoint) -> Self {
        self.collateral_requirement = value;
        self
    }

    /// Set the liquidation reward
    pub fn with_liquidation_reward(mut self, value: FixedPoint) -> Self {
        self.liquidation_reward = value;
        self
    }

    /// Set the fee configuration
    pub fn with_fee(mut self, fee: FeeConfig) -> Self {
        self.fee = fee;
        self
    }

    /// Validate all parameters together
    pub fn validate(&self) -> Result<()> {
        validate_collateral_requirement(self.collateral_requirement)?;
        validate_over_collateralization(self.over_collateralization, self.collateral_requirement)?;
        validate_liquidation_reward(self.liquidation_reward)?;
        self.fee.validate()
    }
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            over_collateralization: FixedPoint::from_percentage(25),
            collateral_requirement: FixedPoint::from_percentage(105),
            liquidation_reward: FixedPoint::from_percentage(75),
            fee: FeeConfig::new(FixedPoint::from_bps(20), vec![], vec![]),
        }
    }
}

/// Accounts holding pool roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRoles {
    /// Pool administrator
    pub admin: Address,
    /// May change parameters and migrate lending
    pub maintainer: Address,
    /// Supplies over-collateral and earns the LP fee share
    pub liquidity_provider: Address,
}

/// Lending binding created together with the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingConfig {
    /// Id of the lending module registered on the proxy
    pub module_id: String,
    /// Interest-bearing token; derived from the module when absent
    pub interest_bearing_token: Option<Address>,
    /// Fraction of realized interest going to the DAO
    pub dao_interest_share: FixedPoint,
    /// Fraction of the DAO interest used for buybacks
    pub jrt_buyback_share: FixedPoint,
}

impl LendingConfig {
    /// Validate shares
    pub fn validate(&self) -> Result<()> {
        if self.module_id.is_empty() {
            return Err(Error::InvalidParameter {
                name: "module_id".into(),
                reason: "cannot be empty".into(),
            });
        }
        validate_fraction("dao_interest_share", self.dao_interest_share)?;
        validate_fraction("jrt_buyback_share", self.jrt_buyback_share)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything needed to deploy a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Price identifier on the feed (e.g. `"EUR/USD"`)
    pub price_identifier: String,
    /// Collateral token
    pub collateral_token: Address,
    /// Synthetic token; the deployer must be its admin
    pub synthetic_token: Address,
    /// Role holders
    pub roles: PoolRoles,
    /// Economic parameters
    pub params: PoolParams,
    /// Lending binding
    pub lending: LendingConfig,
}

impl PoolConfig {
    /// Validate parameters that do not need the ledger or the feed
    pub fn validate(&self) -> Result<()> {
        if self.price_identifier.is_empty() {
            return Err(Error::UnsupportedPriceIdentifier(String::new()));
        }
        self.params.validate()?;
        self.lending.validate()
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::Config(e.to_string()))?;
        Ok(serde_json::from_str(&content)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Chain id bound into meta-transaction signatures
    pub chain_id: u64,
    /// Forwarder domain name
    pub forwarder_name: String,
    /// Forwarder domain version
    pub forwarder_version: String,
    /// Maximum events kept in memory
    pub max_events: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            forwarder_name: FORWARDER_NAME.into(),
            forwarder_version: FORWARDER_VERSION.into(),
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl ProtocolConfig {
    /// Set the chain id
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::Config(e.to_string()))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Config(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply `SYNTHPOOL_*` environment overrides
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(chain_id) = std::env::var("SYNTHPOOL_CHAIN_ID") {
            self.chain_id = chain_id
                .parse()
                .map_err(|_| Error::Config(format!("invalid SYNTHPOOL_CHAIN_ID: {}", chain_id)))?;
        }
        if let Ok(name) = std::env::var("SYNTHPOOL_FORWARDER_NAME") {
            self.forwarder_name = name;
        }
        if let Ok(version) = std::env::var("SYNTHPOOL_FORWARDER_VERSION") {
            self.forwarder_version = version;
        }
        if let Ok(max) = std::env::var("SYNTHPOOL_MAX_EVENTS") {
            self.max_events = max
                .parse()
                .map_err(|_| Error::Config(format!("invalid SYNTHPOOL_MAX_EVENTS: {}", max)))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Load from environment variables on top of defaults
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.forwarder_name.is_empty() || self.forwarder_version.is_empty() {
            return Err(Error::Config("forwarder name and version are required".into()));
        }
        if self.max_events == 0 {
            return Err(Error::Config("max_events must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PoolParams {
        PoolParams::default().with_fee(FeeConfig::new(
            FixedPoint::from_bps(20),
            vec![Address::derive("lp"), Address::derive("dao")],
            vec![50, 50],
        ))
    }

    #[test]
    fn test_default_params_valid() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn test_params_reject_weak_over_collateralization() {
        let weak = params().with_over_collateralization(FixedPoint::from_percentage(4));
        assert!(weak.validate().is_err());
    }

    #[test]
    fn test_pool_config_json() {
        let config = PoolConfig {
            price_identifier: "EUR/USD".into(),
            collateral_token: Address::derive("USDC"),
            synthetic_token: Address::derive("jEUR"),
            roles: PoolRoles {
                admin: Address::derive("admin"),
                maintainer: Address::derive("maintainer"),
                liquidity_provider: Address::derive("lp"),
            },
            params: params(),
            lending: LendingConfig {
                module_id: "aave".into(),
                interest_bearing_token: None,
                dao_interest_share: FixedPoint::from_percentage(40),
                jrt_buyback_share: FixedPoint::from_percentage(50),
            },
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"over_collateralization\":\"0.25\""));
        let back: PoolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert!(back.validate().is_ok());
    }

    #[test]
    fn test_protocol_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synthpool.json");
        let config = ProtocolConfig::default().with_chain_id(137);
        config.save(&path).unwrap();
        assert_eq!(ProtocolConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_protocol_config_validation() {
        let mut config = ProtocolConfig::default();
        assert!(config.validate().is_ok());
        config.max_events = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
