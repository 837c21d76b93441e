//! Structured-data hashing for forward requests.
//!
//! `digest = keccak(0x1901 ∥ domainSeparator ∥ structHash)` where both the
//! domain separator and the struct hash are keccak256 over the type hash
//! followed by one word per member. Dynamic members (`string`, `bytes`) are
//! hashed before encoding.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::protocol::operations::{address_word, u128_word, Word};
use crate::utils::constants::{EIP712_DOMAIN_TYPE, FORWARD_REQUEST_TYPE};
use crate::utils::crypto::{keccak256, Address, Hash};

/// keccak256 of a type string
pub fn type_hash(type_string: &str) -> Hash {
    keccak256(type_string.as_bytes())
}

fn hash_words(words: &[Word]) -> Hash {
    keccak256(&words.concat())
}

/// Signing domain of a forwarder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip712Domain {
    /// Domain name
    pub name: String,
    /// Domain version
    pub version: String,
    /// Chain id
    pub chain_id: u64,
    /// Forwarder address
    pub verifying_contract: Address,
}

impl Eip712Domain {
    /// Domain separator
    pub fn separator(&self) -> Hash {
        hash_words(&[
            *type_hash(EIP712_DOMAIN_TYPE).as_bytes(),
            *keccak256(self.name.as_bytes()).as_bytes(),
            *keccak256(self.version.as_bytes()).as_bytes(),
            u128_word(u128::from(self.chain_id)),
            address_word(&self.verifying_contract),
        ])
    }
}

/// A call signed by `from` for relay through the forwarder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRequest {
    /// Signer
    pub from: Address,
    /// Target
    pub to: Address,
    /// Native value; must be zero
    pub value: u128,
    /// Gas limit; signed but not metered
    pub gas: u128,
    /// Signer nonce
    pub nonce: u128,
    /// Calldata
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl ForwardRequest {
    /// Struct hash of the request
    pub fn struct_hash(&self) -> Hash {
        hash_words(&[
            *type_hash(FORWARD_REQUEST_TYPE).as_bytes(),
            address_word(&self.from),
            address_word(&self.to),
            u128_word(self.value),
            u128_word(self.gas),
            u128_word(self.nonce),
            *keccak256(&self.data).as_bytes(),
        ])
    }

    /// Calldata delivered to the target: `data ∥ from`
    pub fn relayed_data(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        data.extend_from_slice(self.from.as_bytes());
        data
    }
}

/// Final digest signed by the requester
pub fn typed_data_digest(domain_separator: &Hash, struct_hash: &Hash) -> Hash {
    let mut preimage = Vec::with_capacity(2 + 64);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(domain_separator.as_bytes());
    preimage.extend_from_slice(struct_hash.as_bytes());
    keccak256(&preimage)
}

mod hex_bytes {
    use super::*;

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}
