//! Service locator mapping symbolic names to component addresses.
//!
//! Every pool, the lending proxy and the storage manager resolve their
//! collaborators through one registry instance. Only the registry maintainer
//! may change an entry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::crypto::Address;

/// Well-known registry keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegistryKey {
    /// Lending proxy routing pool collateral to modules
    LendingProxy,
    /// Per-pool lending storage
    LendingStorageManager,
    /// Only account allowed to create pool storage
    PoolFactory,
    /// Price oracle
    PriceFeed,
    /// Receiver of DAO commission claims
    CommissionReceiver,
    /// Receiver of buyback proceeds
    BuybackProgramReceiver,
    /// Meta-transaction forwarder trusted by pools
    TrustedForwarder,
    /// Authority allowed to shut pools down
    Manager,
}

impl RegistryKey {
    /// All keys, in declaration order
    pub const ALL: [RegistryKey; 8] = [
        RegistryKey::LendingProxy,
        RegistryKey::LendingStorageManager,
        RegistryKey::PoolFactory,
        RegistryKey::PriceFeed,
        RegistryKey::CommissionReceiver,
        RegistryKey::BuybackProgramReceiver,
        RegistryKey::TrustedForwarder,
        RegistryKey::Manager,
    ];

    /// Symbolic name of the key
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKey::LendingProxy => "LendingProxy",
            RegistryKey::LendingStorageManager => "LendingStorageManager",
            RegistryKey::PoolFactory => "PoolFactory",
            RegistryKey::PriceFeed => "PriceFeed",
            RegistryKey::CommissionReceiver => "CommissionReceiver",
            RegistryKey::BuybackProgramReceiver => "BuybackProgramReceiver",
            RegistryKey::TrustedForwarder => "TrustedForwarder",
            RegistryKey::Manager => "Manager",
        }
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistryKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RegistryKey::ALL
            .iter()
            .find(|key| key.as_str() == s)
            .copied()
            .ok_or_else(|| Error::RegistryKeyNotFound(s.to_string()))
    }
}

/// Registry instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    address: Address,
    maintainer: Address,
    entries: BTreeMap<RegistryKey, Address>,
}

impl Registry {
    /// Create an empty registry
    pub fn new(address: Address, maintainer: Address) -> Self {
        Self {
            address,
            maintainer,
            entries: BTreeMap::new(),
        }
    }

    /// Address identifying this registry instance
    pub fn address(&self) -> Address {
        self.address
    }

    /// Registry maintainer
    pub fn maintainer(&self) -> Address {
        self.maintainer
    }

    /// Bind `key` to `implementation`
    pub fn change_implementation_address(
        &mut self,
        sender: Address,
        key: RegistryKey,
        implementation: Address,
    ) -> Result<()> {
        if sender != self.maintainer {
            return Err(Error::SenderMustBeMaintainer);
        }
        tracing::debug!(key = %key, implementation = %implementation, "registry entry changed");
        self.entries.insert(key, implementation);
        Ok(())
    }

    /// Remove the binding for `key`
    pub fn remove(&mut self, sender: Address, key: RegistryKey) -> Result<()> {
        if sender != self.maintainer {
            return Err(Error::SenderMustBeMaintainer);
        }
        self.entries.remove(&key);
        Ok(())
    }

    /// Resolve `key`
    pub fn get(&self, key: RegistryKey) -> Result<Address> {
        self.try_get(key)
            .ok_or_else(|| Error::RegistryKeyNotFound(key.to_string()))
    }

    /// Resolve `key` if bound
    pub fn try_get(&self, key: RegistryKey) -> Option<Address> {
        self.entries.get(&key).copied()
    }

    /// Check that `sender` is the component bound to `key`
    pub fn ensure(&self, key: RegistryKey, sender: Address) -> Result<()> {
        if self.get(key)? != sender {
            return Err(Error::NotAllowed(format!("sender is not the {}", key)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_maintainer_changes_entries() {
        let maintainer = Address::derive("maintainer");
        let mut registry = Registry::new(Address::derive("registry"), maintainer);
        let factory = Address::derive("factory");

        assert_eq!(
            registry.change_implementation_address(factory, RegistryKey::PoolFactory, factory),
            Err(Error::SenderMustBeMaintainer)
        );
        registry
            .change_implementation_address(maintainer, RegistryKey::PoolFactory, factory)
            .unwrap();

        assert_eq!(registry.get(RegistryKey::PoolFactory).unwrap(), factory);
        assert!(registry.ensure(RegistryKey::PoolFactory, factory).is_ok());
        assert!(registry.ensure(RegistryKey::PoolFactory, maintainer).is_err());
    }

    #[test]
    fn test_missing_key() {
        let registry = Registry::new(Address::derive("registry"), Address::derive("m"));
        assert!(matches!(
            registry.get(RegistryKey::TrustedForwarder),
            Err(Error::RegistryKeyNotFound(name)) if name == "TrustedForwarder"
        ));
    }

    #[test]
    fn test_key_names_roundtrip() {
        for key in RegistryKey::ALL {
            assert_eq!(key.as_str().parse::<RegistryKey>().unwrap(), key);
        }
        assert!("Unknown".parse::<RegistryKey>().is_err());
    }
}
