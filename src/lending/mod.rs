//! Lending layer.
//!
//! Pool collateral is supplied to money markets through a single proxy:
//! - Markets simulate rebasing and exchange-rate interest tokens
//! - Modules adapt each market kind to one interface
//! - The storage manager keeps per-pool bindings and bookkeeping
//! - The manager attributes realized interest and runs DAO claims

pub mod aave;
pub mod compound;
pub mod manager;
pub mod market;
pub mod module;
pub mod storage;
pub mod swap;

pub use aave::*;
pub use compound::*;
pub use manager::*;
pub use market::*;
pub use module::*;
pub use storage::*;
pub use swap::*;
