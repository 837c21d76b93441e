//! synthpool command line interface.
//!
//! The binary is a thin clap layer over the functions here:
//! - `digest`: forwarder digest of a request file
//! - `sign`: sign a request file with a hex key
//! - `simulate`: run a scenario file through the engine
//! - `check-config`: validate a pool config file

pub mod output;
pub mod scenario;

pub use output::*;
pub use scenario::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::config::{PoolConfig, ProtocolConfig};
use crate::error::{Error, Result};
use crate::forwarder::eip712::ForwardRequest;
use crate::forwarder::forwarder::Forwarder;
use crate::utils::crypto::{Address, Hash, PrivateKey, Signature};

/// Forwarder address used when none is given
pub fn default_forwarder_address() -> Address {
    Address::derive("forwarder")
}

/// Engine settings from an optional file, then `SYNTHPOOL_*` overrides
pub fn load_protocol_config(path: Option<&Path>) -> Result<ProtocolConfig> {
    let base = match path {
        Some(path) => ProtocolConfig::load(path)?,
        None => ProtocolConfig::default(),
    };
    base.with_env_overrides()
}

/// Read a JSON forward request
pub fn load_request(path: &Path) -> Result<ForwardRequest> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Config(e.to_string()))?;
    Ok(serde_json::from_str(&content)?)
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Hashes of a forward request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestOutput {
    /// Forwarder address
    pub forwarder: Address,
    /// Domain separator
    pub domain_separator: Hash,
    /// Struct hash of the request
    pub struct_hash: Hash,
    /// Digest to sign
    pub digest: Hash,
}

/// Compute the digest a request must be signed over
pub fn digest_request(
    config: &ProtocolConfig,
    forwarder: Address,
    request: &ForwardRequest,
) -> DigestOutput {
    let forwarder = Forwarder::from_config(forwarder, config);
    DigestOutput {
        forwarder: forwarder.address(),
        domain_separator: forwarder.domain_separator(),
        struct_hash: request.struct_hash(),
        digest: forwarder.digest(request),
    }
}

/// A signed forward request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignOutput {
    /// Signer address
    pub signer: Address,
    /// Signed digest
    pub digest: Hash,
    /// 65-byte recoverable signature
    pub signature: Signature,
}

/// Sign a request; the key must control `request.from`
pub fn sign_request(
    config: &ProtocolConfig,
    forwarder: Address,
    request: &ForwardRequest,
    key: &PrivateKey,
) -> Result<SignOutput> {
    if key.address() != request.from {
        return Err(Error::InvalidParameter {
            name: "key".into(),
            reason: format!("controls {} but request is from {}", key.address(), request.from),
        });
    }
    let forwarder = Forwarder::from_config(forwarder, config);
    Ok(SignOutput {
        signer: key.address(),
        digest: forwarder.digest(request),
        signature: forwarder.sign(key, request),
    })
}

/// Load and validate a pool config file
pub fn check_pool_config(path: &Path) -> Result<PoolConfig> {
    let config = PoolConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Run a scenario file
pub fn simulate(path: &Path) -> Result<Report> {
    let scenario = Scenario::load(path)?;
    tracing::info!(steps = scenario.steps.len(), pools = scenario.pools.len(), "running scenario");
    scenario.run()
}
