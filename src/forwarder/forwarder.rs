//! Meta-transaction forwarder.
//!
//! Verifies a signed [`ForwardRequest`] and prepares it for relay. The
//! forwarder owns the per-signer nonces; a nonce is consumed as soon as a
//! request is accepted, whether or not the relayed call later succeeds.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::config::ProtocolConfig;
use crate::error::{Error, Result};
use crate::forwarder::eip712::{typed_data_digest, Eip712Domain, ForwardRequest};
use crate::utils::crypto::{Address, Hash, PrivateKey, Signature};

/// Forwarder state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forwarder {
    domain: Eip712Domain,
    nonces: HashMap<Address, u128>,
}

impl Forwarder {
    /// Create a forwarder at `address`
    pub fn new(address: Address, name: &str, version: &str, chain_id: u64) -> Self {
        Self {
            domain: Eip712Domain {
                name: name.to_string(),
                version: version.to_string(),
                chain_id,
                verifying_contract: address,
            },
            nonces: HashMap::new(),
        }
    }

    /// Create a forwarder using the configured domain
    pub fn from_config(address: Address, config: &ProtocolConfig) -> Self {
        Self::new(
            address,
            &config.forwarder_name,
            &config.forwarder_version,
            config.chain_id,
        )
    }

    /// Forwarder address
    pub fn address(&self) -> Address {
        self.domain.verifying_contract
    }

    /// Signing domain
    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Domain separator
    pub fn domain_separator(&self) -> Hash {
        self.domain.separator()
    }

    /// Next nonce expected from `from`
    pub fn get_nonce(&self, from: &Address) -> u128 {
        self.nonces.get(from).copied().unwrap_or(0)
    }

    /// Digest a request is signed over
    pub fn digest(&self, request: &ForwardRequest) -> Hash {
        typed_data_digest(&self.domain_separator(), &request.struct_hash())
    }

    /// Sign a request with `key`
    pub fn sign(&self, key: &PrivateKey, request: &ForwardRequest) -> Signature {
        key.sign_digest(&self.digest(request))
    }

    /// Whether the nonce is current and the signature recovers to `from`
    pub fn verify(&self, request: &ForwardRequest, signature: &Signature) -> bool {
        if request.nonce != self.get_nonce(&request.from) {
            return false;
        }
        signature
            .recover(&self.digest(request))
            .map(|signer| signer == request.from)
            .unwrap_or(false)
    }

    /// Accept a request: verify it, consume its nonce and return the relayed calldata
    pub fn accept(&mut self, request: &ForwardRequest, signature: &Signature) -> Result<Vec<u8>> {
        if !self.verify(request, signature) {
            return Err(Error::SignatureMismatch);
        }
        if request.value > 0 {
            return Err(Error::InvalidParameter {
                name: "value".into(),
                reason: "native value cannot be forwarded".into(),
            });
        }
        let next = request.nonce.checked_add(1).ok_or_else(|| Error::Overflow {
            operation: "nonce".into(),
        })?;
        self.nonces.insert(request.from, next);
        tracing::debug!(from = %request.from, to = %request.to, nonce = request.nonce, "request accepted");
        Ok(request.relayed_data())
    }
}
