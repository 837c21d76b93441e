//! Core modules for the synthpool engine.
//!
//! This module contains the fundamental building blocks:
//! - Configuration and pool parameters
//! - Fee percentage and recipient split
//! - In-memory token ledger
//! - Registry (service locator)
//! - Shared execution context

pub mod config;
pub mod context;
pub mod fees;
pub mod registry;
pub mod token;

pub use config::*;
pub use context::*;
pub use fees::*;
pub use registry::*;
pub use token::*;
