//! Engine constants.
//!
//! All engine-wide constants are defined here for easy auditing.

// ═══════════════════════════════════════════════════════════════════════════════
// PRECISION
// ═══════════════════════════════════════════════════════════════════════════════

/// Decimals of every fixed-point fraction and price
pub const FIXED_POINT_DECIMALS: u8 = 18;

/// Decimals a synthetic token must have
pub const SYNTHETIC_TOKEN_DECIMALS: u8 = 18;

/// Largest collateral decimals a pool accepts
pub const MAX_COLLATERAL_DECIMALS: u8 = 18;

// ═══════════════════════════════════════════════════════════════════════════════
// ENCODING
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of an account address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Length of a keccak256 digest in bytes
pub const HASH_LENGTH: usize = 32;

/// Length of a recoverable signature (`r ∥ s ∥ v`)
pub const SIGNATURE_LENGTH: usize = 65;

/// Length of a function selector in calldata
pub const SELECTOR_LENGTH: usize = 4;

/// Length of one ABI word
pub const WORD_LENGTH: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// POOL
// ═══════════════════════════════════════════════════════════════════════════════

/// Version reported by pools
pub const POOL_VERSION: u8 = 5;

/// Default cap on retained event records
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

// ═══════════════════════════════════════════════════════════════════════════════
// META-TRANSACTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default forwarder domain name
pub const FORWARDER_NAME: &str = "MinimalForwarder";

/// Default forwarder domain version
pub const FORWARDER_VERSION: &str = "0.0.1";

/// Structured-data domain type
pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Forward request type
pub const FORWARD_REQUEST_TYPE: &str =
    "ForwardRequest(address from,address to,uint256 value,uint256 gas,uint256 nonce,bytes data)";

/// Default chain id
pub const DEFAULT_CHAIN_ID: u64 = 1;
