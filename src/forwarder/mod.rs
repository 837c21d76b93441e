//! Meta-transaction forwarding.
//!
//! - Structured-data digests of forward requests
//! - Signature and nonce verification before relay

pub mod eip712;
pub mod forwarder;

pub use eip712::*;
pub use forwarder::*;
