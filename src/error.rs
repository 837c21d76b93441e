//! Error types for the synthpool engine.
//!
//! Every operation aborts as a whole with one of these errors; no partial
//! state is ever committed. Variants are grouped by category and carry a
//! stable numeric code for external consumers.

use thiserror::Error;

/// Result type alias for synthpool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller lacks the role required by the operation
    Authorization,
    /// Malformed or out-of-range input
    Validation,
    /// Operation would break an economic constraint
    Economic,
    /// Operation not allowed in the current lifecycle state
    State,
    /// Meta-transaction or calldata failure
    Protocol,
    /// Arithmetic or serialization failure inside the engine
    Internal,
}

/// Main error type for the synthpool engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Caller is not allowed to perform this action
    #[error("Not allowed: {0}")]
    NotAllowed(String),

    /// Caller must hold the maintainer role
    #[error("Sender must be the maintainer")]
    SenderMustBeMaintainer,

    /// Caller must be the pool's liquidity provider
    #[error("Sender must be the liquidity provider")]
    SenderMustBeLP,

    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Amount is zero
    #[error("Amount cannot be zero")]
    ZeroAmount,

    /// Request deadline has passed
    #[error("Transaction expired: deadline {expiration}, now {now}")]
    TransactionExpired {
        /// Deadline carried by the request
        expiration: u64,
        /// Engine time at execution
        now: u64,
    },

    /// Two parallel arrays have different lengths
    #[error("Array length mismatch: {left} vs {right}")]
    ArrayLengthMismatch {
        /// Length of the first array
        left: usize,
        /// Length of the second array
        right: usize,
    },

    /// Token decimals outside what the pool supports
    #[error("Bad decimals for {token}: {decimals}")]
    BadDecimals {
        /// Token symbol or address
        token: String,
        /// Offending decimals
        decimals: u8,
    },

    /// The price feed does not know this identifier
    #[error("Unsupported price identifier: {0}")]
    UnsupportedPriceIdentifier(String),

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// More synthetic tokens requested than the pool has issued
    #[error("Insufficient synthetic tokens: requested {requested}, outstanding {available}")]
    InsufficientSyntheticTokens {
        /// Requested amount
        requested: u128,
        /// Outstanding amount
        available: u128,
    },

    /// Token balance too low for a transfer or burn
    #[error("Insufficient {token} balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Token symbol
        token: String,
        /// Required amount
        required: u128,
        /// Available amount
        available: u128,
    },

    /// Two components that must agree on configuration do not
    #[error("Configuration mismatch: {0}")]
    ConfigMismatch(String),

    /// Calldata could not be decoded
    #[error("Invalid calldata: {0}")]
    InvalidCalldata(String),

    // ═══════════════════════════════════════════════════════════════════
    // Economic Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Output below the caller's minimum
    #[error("Slippage exceeded: minimum {minimum}, actual {actual}")]
    SlippageExceeded {
        /// Minimum acceptable output
        minimum: u128,
        /// Output the operation would produce
        actual: u128,
    },

    /// Not enough free liquidity in the pool
    #[error("Insufficient liquidity: required {required}, available {available}")]
    InsufficientLiquidity {
        /// Required amount
        required: u128,
        /// Available amount
        available: u128,
    },

    /// Redemption would leave the position below its collateral requirement
    #[error("Position undercapitalized")]
    PositionUndercapitalized,

    /// Collateral decrease would leave the position below its requirement
    #[error("Position undercollateralized")]
    PositionUndercollateralized,

    /// Position is healthy and cannot be liquidated
    #[error("Position is overcollateralized")]
    PositionOvercollateralized,

    /// Claim larger than what has accrued
    #[error("Claim exceeds accrued amount: requested {requested}, available {available}")]
    ClaimExceedsAccrued {
        /// Requested amount
        requested: u128,
        /// Accrued amount
        available: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // State Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Entity was already initialized
    #[error("Already initialized: {0}")]
    AlreadyInitialized(String),

    /// Pool is shut down
    #[error("Pool already shut down")]
    AlreadyShutDown,

    /// Pool is not shut down
    #[error("Pool not shut down")]
    NotShutDown,

    /// Caller has no fee to claim
    #[error("No fee to claim")]
    NoFeeToClaim,

    /// Pool is not known to this component
    #[error("Not existing pool: {0}")]
    PoolNotFound(String),

    /// Registry has no entry for the key
    #[error("Registry key not found: {0}")]
    RegistryKeyNotFound(String),

    /// No lending module registered under the id
    #[error("Lending module not found: {0}")]
    LendingModuleNotFound(String),

    /// Token is not known to the ledger
    #[error("Token not found: {0}")]
    TokenNotFound(String),

    /// Money market is not known
    #[error("Market not found: {0}")]
    MarketNotFound(String),

    /// Pool is already executing an operation
    #[error("Reentrant call into pool {0}")]
    ReentrantCall(String),

    // ═══════════════════════════════════════════════════════════════════
    // Protocol Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Recovered signer or nonce does not match the request
    #[error("Signature does not match request")]
    SignatureMismatch,

    /// The relayed call failed
    #[error("Forwarded call failed: {0}")]
    ForwardedCallError(String),

    /// Cryptographic operation failed
    #[error("Crypto error in {operation}: {details}")]
    CryptoError {
        /// Operation that failed
        operation: String,
        /// Error details
        details: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Underflow in calculation
    #[error("Arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self.code() / 1000 {
            1 => ErrorCategory::Authorization,
            2 => ErrorCategory::Validation,
            3 => ErrorCategory::Economic,
            4 => ErrorCategory::State,
            5 => ErrorCategory::Protocol,
            _ => ErrorCategory::Internal,
        }
    }

    /// Returns true if the caller can succeed by retrying with different inputs
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Validation | ErrorCategory::Economic
        )
    }

    /// Returns true if this error points at a bug in the engine
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::Internal(_) | Error::Overflow { .. } | Error::Underflow { .. }
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Authorization errors: 1xxx
            Error::NotAllowed(_) => 1001,
            Error::SenderMustBeMaintainer => 1002,
            Error::SenderMustBeLP => 1003,

            // Validation errors: 2xxx
            Error::ZeroAmount => 2001,
            Error::TransactionExpired { .. } => 2002,
            Error::ArrayLengthMismatch { .. } => 2003,
            Error::BadDecimals { .. } => 2004,
            Error::UnsupportedPriceIdentifier(_) => 2005,
            Error::InvalidParameter { .. } => 2006,
            Error::InsufficientSyntheticTokens { .. } => 2007,
            Error::InsufficientBalance { .. } => 2008,
            Error::ConfigMismatch(_) => 2009,
            Error::InvalidCalldata(_) => 2010,

            // Economic errors: 3xxx
            Error::SlippageExceeded { .. } => 3001,
            Error::InsufficientLiquidity { .. } => 3002,
            Error::PositionUndercapitalized => 3003,
            Error::PositionUndercollateralized => 3004,
            Error::PositionOvercollateralized => 3005,
            Error::ClaimExceedsAccrued { .. } => 3006,

            // State errors: 4xxx
            Error::AlreadyInitialized(_) => 4001,
            Error::AlreadyShutDown => 4002,
            Error::NotShutDown => 4003,
            Error::NoFeeToClaim => 4004,
            Error::PoolNotFound(_) => 4005,
            Error::RegistryKeyNotFound(_) => 4006,
            Error::LendingModuleNotFound(_) => 4007,
            Error::TokenNotFound(_) => 4008,
            Error::MarketNotFound(_) => 4009,
            Error::ReentrantCall(_) => 4010,

            // Protocol errors: 5xxx
            Error::SignatureMismatch => 5001,
            Error::ForwardedCallError(_) => 5002,
            Error::CryptoError { .. } => 5003,

            // Internal errors: 9xxx
            Error::Overflow { .. } => 9001,
            Error::Underflow { .. } => 9002,
            Error::Serialization(_) => 9003,
            Error::Config(_) => 9004,
            Error::Internal(_) => 9005,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_unique() {
        let codes = vec![
            Error::NotAllowed("".into()).code(),
            Error::SenderMustBeMaintainer.code(),
            Error::ZeroAmount.code(),
            Error::ConfigMismatch("".into()).code(),
            Error::SlippageExceeded { minimum: 0, actual: 0 }.code(),
            Error::PositionOvercollateralized.code(),
            Error::AlreadyShutDown.code(),
            Error::PoolNotFound("".into()).code(),
            Error::SignatureMismatch.code(),
            Error::ForwardedCallError("".into()).code(),
            Error::Internal("".into()).code(),
        ];

        let mut unique_codes = codes.clone();
        unique_codes.sort();
        unique_codes.dedup();

        assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");
    }

    #[test]
    fn test_categories() {
        assert_eq!(Error::SenderMustBeLP.category(), ErrorCategory::Authorization);
        assert_eq!(Error::ZeroAmount.category(), ErrorCategory::Validation);
        assert_eq!(
            Error::InsufficientLiquidity { required: 1, available: 0 }.category(),
            ErrorCategory::Economic
        );
        assert_eq!(Error::NotShutDown.category(), ErrorCategory::State);
        assert_eq!(Error::SignatureMismatch.category(), ErrorCategory::Protocol);
        assert_eq!(
            Error::Overflow { operation: "x".into() }.category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientLiquidity {
            required: 1000,
            available: 500,
        };
        assert!(err.to_string().contains("1000"));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_is_critical() {
        assert!(Error::Overflow { operation: "test".into() }.is_critical());
        assert!(!Error::PoolNotFound("test".into()).is_critical());
        assert!(Error::SlippageExceeded { minimum: 2, actual: 1 }.is_recoverable());
        assert!(!Error::AlreadyShutDown.is_recoverable());
    }
}
