//! Error types for identifier parsing and unit conversion.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid length for {kind}: expected {expected}, got {actual}")]
    InvalidLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("missing 0x prefix for {0}")]
    MissingPrefix(&'static str),
    #[error("invalid decimal amount `{0}`")]
    InvalidAmount(String),
    #[error("amount `{value}` has more than {decimals} fractional digits")]
    TooPrecise { value: String, decimals: u8 },
    #[error("amount overflows 256 bits")]
    Overflow,
    #[error("{0} decimals cannot be represented in 256 bits")]
    InvalidDecimals(u8),
}

/// Failure reported by the wallet provider or the chain behind it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("wallet provider unavailable")]
    Unavailable,
    #[error("user rejected the request: {0}")]
    UserRejected(String),
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("{0}")]
    Internal(String),
}

impl ProviderError {
    /// EIP-1193 code for a request the user declined in the wallet.
    pub const USER_REJECTED_CODE: i64 = 4001;

    /// Classifies a JSON-RPC style error from the provider.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        if code == Self::USER_REJECTED_CODE {
            Self::UserRejected(message)
        } else {
            Self::Rpc { code, message }
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected(_))
    }
}

/// Failure fetching one token's off-chain metadata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("unsupported content uri `{0}`")]
    UnsupportedUri(String),
    #[error("metadata not found at `{0}`")]
    NotFound(String),
    #[error("metadata request to `{uri}` failed with status {status}")]
    Http { uri: String, status: u16 },
    #[error("metadata transport error: {0}")]
    Transport(String),
    #[error("metadata decode error: {0}")]
    Decode(String),
}
