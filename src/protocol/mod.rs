//! Protocol layer.
//!
//! This module ties the pools together:
//! - Events emitted by pools, the lending proxy and the forwarder
//! - Pool calls and their fixed-width calldata encoding
//! - The orchestrator running every operation atomically

pub mod events;
pub mod operations;
pub mod state_machine;

pub use events::*;
pub use operations::*;
pub use state_machine::*;
