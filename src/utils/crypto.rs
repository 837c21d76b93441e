//! Cryptographic primitives for the engine.
//!
//! - Hashes (keccak256)
//! - Account addresses (20 bytes, derived from secp256k1 public keys)
//! - Private keys and 65-byte recoverable signatures
//!
//! Addresses follow the account model used by the forwarder: the last 20
//! bytes of the keccak256 of the uncompressed public key (without its prefix
//! byte).

use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey as Secp256k1PubKey, Secp256k1, SecretKey,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::constants::{ADDRESS_LENGTH, HASH_LENGTH, SIGNATURE_LENGTH};

// ═══════════════════════════════════════════════════════════════════════════════
// SECP256K1 CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

thread_local! {
    static SECP: Secp256k1<secp256k1::All> = Secp256k1::new();
}

/// Half the curve order; canonical signatures keep `s` at or below it
const HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// Execute a function with the secp256k1 context
fn with_secp<F, R>(f: F) -> R
where
    F: FnOnce(&Secp256k1<secp256k1::All>) -> R,
{
    SECP.with(|secp| f(secp))
}

fn decode_hex(name: &str, s: &str) -> Result<Vec<u8>> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(trimmed).map_err(|e| Error::InvalidParameter {
        name: name.into(),
        reason: e.to_string(),
    })
}

/// keccak256 of `data`
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut bytes = [0u8; HASH_LENGTH];
    bytes.copy_from_slice(&hasher.finalize());
    Hash(bytes)
}

// ═══════════════════════════════════════════════════════════════════════════════
// HASH
// ═══════════════════════════════════════════════════════════════════════════════

/// A 32-byte keccak256 digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash([u8; HASH_LENGTH]);

impl Hash {
    /// Create a new hash from bytes
    pub fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create a hash from a slice (must be exactly 32 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != HASH_LENGTH {
            return Err(Error::InvalidParameter {
                name: "hash".into(),
                reason: format!("expected {} bytes, got {}", HASH_LENGTH, slice.len()),
            });
        }
        let mut bytes = [0u8; HASH_LENGTH];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the hash as bytes
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// Convert to hex string (0x-prefixed)
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Create from hex string, with or without 0x prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_slice(&decode_hex("hash", s)?)
    }

    fn to_message(self) -> Message {
        Message::from_digest(self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..18])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A 20-byte account or component address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The zero address
    pub const ZERO: Self = Self([0u8; ADDRESS_LENGTH]);

    /// Create an address from bytes
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create from a slice (must be exactly 20 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != ADDRESS_LENGTH {
            return Err(Error::InvalidParameter {
                name: "address".into(),
                reason: format!("expected {} bytes, got {}", ADDRESS_LENGTH, slice.len()),
            });
        }
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Deterministic address for a named component
    pub fn derive(label: &str) -> Self {
        let hash = keccak256(label.as_bytes());
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&hash.as_bytes()[HASH_LENGTH - ADDRESS_LENGTH..]);
        Self(bytes)
    }

    /// Address controlled by a public key
    pub fn from_public_key(key: &Secp256k1PubKey) -> Self {
        let uncompressed = key.serialize_uncompressed();
        let hash = keccak256(&uncompressed[1..]);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&hash.as_bytes()[HASH_LENGTH - ADDRESS_LENGTH..]);
        Self(bytes)
    }

    /// Get the address as bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Convert to hex string (0x-prefixed)
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Create from hex string, with or without 0x prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_slice(&decode_hex("address", s)?)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRIVATE KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Private key length in bytes
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// A secp256k1 private key for signing operations
#[derive(Clone)]
pub struct PrivateKey {
    inner: SecretKey,
}

impl PrivateKey {
    /// Create a new private key from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != PRIVATE_KEY_LENGTH {
            return Err(Error::InvalidParameter {
                name: "private_key".into(),
                reason: format!(
                    "expected {} bytes, got {}",
                    PRIVATE_KEY_LENGTH,
                    slice.len()
                ),
            });
        }
        let inner = SecretKey::from_slice(slice).map_err(|e| Error::CryptoError {
            operation: "private_key_from_slice".into(),
            details: e.to_string(),
        })?;
        Ok(Self { inner })
    }

    /// Generate a new random private key
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let inner = SecretKey::new(&mut rng);
        Self { inner }
    }

    /// Create from hex string, with or without 0x prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_slice(&decode_hex("private_key", s)?)
    }

    /// Address controlled by this key
    pub fn address(&self) -> Address {
        with_secp(|secp| {
            let pk = Secp256k1PubKey::from_secret_key(secp, &self.inner);
            Address::from_public_key(&pk)
        })
    }

    /// Sign a 32-byte digest, producing `r ∥ s ∥ v` with `v ∈ {27, 28}`
    pub fn sign_digest(&self, digest: &Hash) -> Signature {
        with_secp(|secp| {
            let sig = secp.sign_ecdsa_recoverable(&digest.to_message(), &self.inner);
            let (recovery_id, compact) = sig.serialize_compact();
            let mut bytes = [0u8; SIGNATURE_LENGTH];
            bytes[..64].copy_from_slice(&compact);
            bytes[64] = 27 + recovery_id.to_i32() as u8;
            Signature(bytes)
        })
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIGNATURE
// ═══════════════════════════════════════════════════════════════════════════════

/// A 65-byte recoverable ECDSA signature (`r ∥ s ∥ v`)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LENGTH]);

impl Signature {
    /// Create a signature from bytes
    pub fn new(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create from a slice (must be exactly 65 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != SIGNATURE_LENGTH {
            return Err(Error::InvalidParameter {
                name: "signature".into(),
                reason: format!("expected {} bytes, got {}", SIGNATURE_LENGTH, slice.len()),
            });
        }
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the signature as bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    /// Convert to hex string (0x-prefixed)
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Create from hex string, with or without 0x prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_slice(&decode_hex("signature", s)?)
    }

    /// Recover the address that produced this signature over `digest`.
    /// High-s signatures are rejected so each message has one valid encoding.
    pub fn recover(&self, digest: &Hash) -> Result<Address> {
        if self.0[32..64] > HALF_ORDER[..] {
            return Err(Error::CryptoError {
                operation: "recover".into(),
                details: "non-canonical s value".into(),
            });
        }
        let v = self.0[64];
        let recovery = match v {
            27 | 28 => (v - 27) as i32,
            0 | 1 => v as i32,
            _ => {
                return Err(Error::CryptoError {
                    operation: "recover".into(),
                    details: format!("invalid recovery byte {}", v),
                })
            }
        };
        let crypto_err = |e: secp256k1::Error| Error::CryptoError {
            operation: "recover".into(),
            details: e.to_string(),
        };
        let recovery_id = RecoveryId::from_i32(recovery).map_err(crypto_err)?;
        let sig = RecoverableSignature::from_compact(&self.0[..64], recovery_id)
            .map_err(crypto_err)?;
        let key = with_secp(|secp| secp.recover_ecdsa(&digest.to_message(), &sig))
            .map_err(crypto_err)?;
        Ok(Address::from_public_key(&key))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..18])
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Signature::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            keccak256(b"").to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_address_from_known_key() {
        let key = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(
            key.address().to_hex(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_sign_and_recover() {
        let key = PrivateKey::generate();
        let digest = keccak256(b"forward me");
        let sig = key.sign_digest(&digest);

        assert!(sig.as_bytes()[64] == 27 || sig.as_bytes()[64] == 28);
        assert_eq!(sig.recover(&digest).unwrap(), key.address());

        let other = keccak256(b"something else");
        assert_ne!(sig.recover(&other).unwrap_or(Address::ZERO), key.address());
    }

    #[test]
    fn test_recover_rejects_bad_v() {
        let key = PrivateKey::generate();
        let digest = keccak256(b"x");
        let mut bytes = *key.sign_digest(&digest).as_bytes();
        bytes[64] = 5;
        assert!(Signature::new(bytes).recover(&digest).is_err());
    }

    /// `n - s` over the secp256k1 order
    fn mirrored_s(s: &[u8]) -> [u8; 32] {
        const ORDER: [u8; 32] = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c,
            0xd0, 0x36, 0x41, 0x41,
        ];
        let mut out = [0u8; 32];
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let mut diff = ORDER[i] as i16 - s[i] as i16 - borrow;
            borrow = if diff < 0 { 1 } else { 0 };
            if diff < 0 {
                diff += 256;
            }
            out[i] = diff as u8;
        }
        out
    }

    #[test]
    fn test_recover_rejects_high_s() {
        let key = PrivateKey::generate();
        let digest = keccak256(b"relay once");
        let sig = key.sign_digest(&digest);
        assert!(sig.as_bytes()[32..64] <= HALF_ORDER[..]);

        let mut bytes = *sig.as_bytes();
        let high = mirrored_s(&bytes[32..64]);
        bytes[32..64].copy_from_slice(&high);
        bytes[64] = if bytes[64] == 27 { 28 } else { 27 };
        assert!(matches!(
            Signature::new(bytes).recover(&digest),
            Err(Error::CryptoError { .. })
        ));
    }

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::derive("pool");
        let parsed: Address = addr.to_hex().parse().unwrap();
        assert_eq!(parsed, addr);
        assert!(Address::from_hex("0x1234").is_err());
        assert!(Address::ZERO.is_zero());
    }
}
