//! Per-pool lending storage.
//!
//! Holds each pool's lending binding and interest bookkeeping:
//! - Created only by the registered pool factory
//! - Mutated only by the registered lending proxy
//! - Migrated atomically, leaving the source zeroed

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::registry::{Registry, RegistryKey};
use crate::error::{Error, Result};
use crate::utils::crypto::Address;
use crate::utils::math::{safe_add, FixedPoint};
use crate::utils::validation::validate_fraction;

/// Lending state of one pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStorage {
    /// Module id registered on the proxy
    pub lending_module_id: String,
    /// Collateral token
    pub collateral: Address,
    /// Interest-bearing token of the bound market
    pub interest_bearing_token: Address,
    /// Fraction of realized interest going to the DAO
    pub dao_interest_share: FixedPoint,
    /// Fraction of the DAO interest reserved for buybacks
    pub jrt_buyback_share: FixedPoint,
    /// Collateral attributed to the pool, including its realized interest
    pub collateral_deposited: u128,
    /// DAO interest reserved for buybacks, not yet claimed
    pub unclaimed_dao_jrt: u128,
    /// DAO interest reserved as commission, not yet claimed
    pub unclaimed_dao_commission: u128,
}

impl PoolStorage {
    /// Fraction of the DAO interest kept as commission
    pub fn commission_share(&self) -> FixedPoint {
        FixedPoint::ONE.saturating_sub(self.jrt_buyback_share)
    }

    /// Everything the storage attributes to the pool and the DAO
    pub fn total_attributed(&self) -> Result<u128> {
        safe_add(
            safe_add(self.collateral_deposited, self.unclaimed_dao_jrt)?,
            self.unclaimed_dao_commission,
        )
    }

    /// A zeroed entry is treated as absent
    pub fn is_registered(&self) -> bool {
        !self.collateral.is_zero()
    }
}

/// Storage manager for every pool using the lending layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingStorageManager {
    address: Address,
    pools: HashMap<Address, PoolStorage>,
}

impl LendingStorageManager {
    /// Create an empty storage manager
    pub fn new(address: Address) -> Self {
        Self {
            address,
            pools: HashMap::new(),
        }
    }

    /// Address of this storage manager
    pub fn address(&self) -> Address {
        self.address
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FACTORY OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Create the storage of a new pool
    #[allow(clippy::too_many_arguments)]
    pub fn set_pool_storage(
        &mut self,
        registry: &Registry,
        sender: Address,
        lending_module_id: &str,
        pool: Address,
        collateral: Address,
        interest_bearing_token: Address,
        dao_interest_share: FixedPoint,
        jrt_buyback_share: FixedPoint,
    ) -> Result<()> {
        registry.ensure(RegistryKey::PoolFactory, sender)?;
        if self.pools.get(&pool).map_or(false, PoolStorage::is_registered) {
            return Err(Error::AlreadyInitialized(format!("pool storage {}", pool)));
        }
        if collateral.is_zero() {
            return Err(Error::InvalidParameter {
                name: "collateral".into(),
                reason: "cannot be the zero address".into(),
            });
        }
        validate_fraction("dao_interest_share", dao_interest_share)?;
        validate_fraction("jrt_buyback_share", jrt_buyback_share)?;

        self.pools.insert(
            pool,
            PoolStorage {
                lending_module_id: lending_module_id.to_string(),
                collateral,
                interest_bearing_token,
                dao_interest_share,
                jrt_buyback_share,
                ..Default::default()
            },
        );
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VIEWS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Storage of a registered pool
    pub fn pool_storage(&self, pool: &Address) -> Result<&PoolStorage> {
        self.pools
            .get(pool)
            .filter(|s| s.is_registered())
            .ok_or_else(|| Error::PoolNotFound(pool.to_hex()))
    }

    /// Whether a pool has storage
    pub fn contains(&self, pool: &Address) -> bool {
        self.pool_storage(pool).is_ok()
    }

    /// `(dao_interest_share, jrt_buyback_share)` of a pool
    pub fn shares(&self, pool: &Address) -> Result<(FixedPoint, FixedPoint)> {
        let storage = self.pool_storage(pool)?;
        Ok((storage.dao_interest_share, storage.jrt_buyback_share))
    }

    /// `(module_id, interest_bearing_token)` of a pool
    pub fn lending_binding(&self, pool: &Address) -> Result<(String, Address)> {
        let storage = self.pool_storage(pool)?;
        Ok((
            storage.lending_module_id.clone(),
            storage.interest_bearing_token,
        ))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PROXY OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Apply `update` to a pool's storage
    pub fn update_values<F>(
        &mut self,
        registry: &Registry,
        sender: Address,
        pool: &Address,
        update: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut PoolStorage) -> Result<()>,
    {
        registry.ensure(RegistryKey::LendingProxy, sender)?;
        let storage = self
            .pools
            .get_mut(pool)
            .filter(|s| s.is_registered())
            .ok_or_else(|| Error::PoolNotFound(pool.to_hex()))?;
        let mut updated = storage.clone();
        update(&mut updated)?;
        *storage = updated;
        Ok(())
    }

    /// Move a pool's storage to a new pool address, zeroing the source
    pub fn migrate_pool(
        &mut self,
        registry: &Registry,
        sender: Address,
        old_pool: &Address,
        new_pool: Address,
    ) -> Result<PoolStorage> {
        registry.ensure(RegistryKey::LendingProxy, sender)?;
        if self.contains(&new_pool) {
            return Err(Error::AlreadyInitialized(format!("pool storage {}", new_pool)));
        }
        let source = self
            .pools
            .get_mut(old_pool)
            .filter(|s| s.is_registered())
            .ok_or_else(|| Error::PoolNotFound(old_pool.to_hex()))?;
        let moved = std::mem::take(source);
        self.pools.insert(new_pool, moved.clone());
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        registry: Registry,
        storage: LendingStorageManager,
        factory: Address,
        proxy: Address,
        pool: Address,
    }

    fn fixture() -> Fixture {
        let maintainer = Address::derive("maintainer");
        let factory = Address::derive("factory");
        let proxy = Address::derive("proxy");
        let mut registry = Registry::new(Address::derive("registry"), maintainer);
        registry
            .change_implementation_address(maintainer, RegistryKey::PoolFactory, factory)
            .unwrap();
        registry
            .change_implementation_address(maintainer, RegistryKey::LendingProxy, proxy)
            .unwrap();
        let mut storage = LendingStorageManager::new(Address::derive("storage"));
        let pool = Address::derive("pool");
        storage
            .set_pool_storage(
                &registry,
                factory,
                "aave",
                pool,
                Address::derive("USDC"),
                Address::derive("aUSDC"),
                FixedPoint::from_percentage(40),
                FixedPoint::from_percentage(50),
            )
            .unwrap();
        Fixture {
            registry,
            storage,
            factory,
            proxy,
            pool,
        }
    }

    #[test]
    fn test_only_factory_creates() {
        let mut f = fixture();
        let err = f
            .storage
            .set_pool_storage(
                &f.registry,
                f.proxy,
                "aave",
                Address::derive("other"),
                Address::derive("USDC"),
                Address::derive("aUSDC"),
                FixedPoint::ZERO,
                FixedPoint::ZERO,
            )
            .unwrap_err();
        assert!(matches!(err, Error::NotAllowed(_)));

        let err = f
            .storage
            .set_pool_storage(
                &f.registry,
                f.factory,
                "aave",
                f.pool,
                Address::derive("USDC"),
                Address::derive("aUSDC"),
                FixedPoint::ZERO,
                FixedPoint::ZERO,
            )
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized(_)));
    }

    #[test]
    fn test_only_proxy_updates() {
        let mut f = fixture();
        let pool = f.pool;
        assert!(matches!(
            f.storage.update_values(&f.registry, f.factory, &pool, |s| {
                s.collateral_deposited = 1;
                Ok(())
            }),
            Err(Error::NotAllowed(_))
        ));
        f.storage
            .update_values(&f.registry, f.proxy, &pool, |s| {
                s.collateral_deposited = 10;
                Ok(())
            })
            .unwrap();
        assert_eq!(f.storage.pool_storage(&pool).unwrap().collateral_deposited, 10);
    }

    #[test]
    fn test_failed_update_leaves_storage_untouched() {
        let mut f = fixture();
        let pool = f.pool;
        let result = f.storage.update_values(&f.registry, f.proxy, &pool, |s| {
            s.collateral_deposited = 99;
            Err(Error::ZeroAmount)
        });
        assert!(result.is_err());
        assert_eq!(f.storage.pool_storage(&pool).unwrap().collateral_deposited, 0);
    }

    #[test]
    fn test_migrate_zeroes_source() {
        let mut f = fixture();
        let new_pool = Address::derive("new pool");
        let moved = f
            .storage
            .migrate_pool(&f.registry, f.proxy, &f.pool.clone(), new_pool)
            .unwrap();

        assert_eq!(moved.lending_module_id, "aave");
        assert!(matches!(
            f.storage.pool_storage(&f.pool),
            Err(Error::PoolNotFound(_))
        ));
        assert_eq!(f.storage.shares(&new_pool).unwrap().0, FixedPoint::from_percentage(40));
        assert_eq!(
            f.storage.pool_storage(&new_pool).unwrap().commission_share(),
            FixedPoint::from_percentage(50)
        );
    }
}
