//! # synthpool
//!
//! Collateral-backed synthetic asset pools. Users mint synthetic tokens
//! against stable collateral at an oracle price; a liquidity provider
//! over-collateralizes the position and earns fees; idle collateral earns
//! lending yield through a pluggable proxy.
//!
//! ## Architecture
//!
//! - **Core**: Configuration, fees, token ledger, registry and context
//! - **Pool**: Mint, redeem, exchange and LP position management
//! - **Liquidation**: Partial liquidation and shutdown settlement sizing
//! - **Lending**: Money markets, modules, per-pool storage and the proxy
//! - **Forwarder**: Signed meta-transactions with per-signer nonces
//! - **Protocol**: Events, calldata and the atomic orchestrator
//!
//! ## Example
//!
//! ```rust,ignore
//! use synthpool::prelude::*;
//!
//! let outcome = protocol.mint(user, pool, MintParams {
//!     min_num_tokens: 1,
//!     collateral_amount: 120_240_480,
//!     expiration: deadline,
//!     recipient: user,
//! })?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod forwarder;
pub mod lending;
pub mod liquidation;
pub mod oracle;
pub mod pool;
pub mod protocol;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::{LendingConfig, PoolConfig, PoolParams, PoolRoles, ProtocolConfig},
        context::Context,
        fees::FeeConfig,
        registry::{Registry, RegistryKey},
        token::TokenLedger,
    };
    pub use crate::error::{Error, Result};
    pub use crate::forwarder::{eip712::ForwardRequest, forwarder::Forwarder};
    pub use crate::lending::{
        manager::{LendingManager, LendingRoles},
        market::{MarketKind, MoneyMarket},
        module::LendingModuleKind,
        storage::LendingStorageManager,
    };
    pub use crate::oracle::price_feed::{ManualPriceFeed, PriceFeed};
    pub use crate::pool::pool::{ExchangeParams, MintParams, Pool, RedeemParams};
    pub use crate::protocol::{
        events::Event,
        operations::{CallOutcome, PoolCall},
        state_machine::Protocol,
    };
    pub use crate::utils::{
        crypto::{Address, Hash, PrivateKey, Signature},
        math::FixedPoint,
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const PROTOCOL_NAME: &str = "synthpool";
