//! Client-facing error taxonomy.

use nftmarket_types::{MetadataError, ProviderError, TokenId, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable classification of a [`MarketError`], for UI branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ProviderUnavailable,
    UserRejected,
    NotConnected,
    InvalidAccount,
    Provider,
    ChainRead,
    ChainWrite,
    TransactionRejected,
    AlreadyInProgress,
    MetadataFetch,
    InvalidConfig,
}

/// Error kind plus the human-readable message, including any raw provider text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketError {
    #[error("no wallet provider found; install a wallet extension")]
    ProviderUnavailable,
    #[error("wallet request rejected: {0}")]
    UserRejected(String),
    #[error("wallet not connected")]
    NotConnected,
    #[error("wallet reported an invalid account: {0}")]
    InvalidAccount(#[from] ValidationError),
    #[error("wallet provider error: {0}")]
    Provider(ProviderError),
    #[error("marketplace read failed: {0}")]
    ChainRead(ProviderError),
    #[error("marketplace write failed: {0}")]
    ChainWrite(ProviderError),
    #[error("transaction rejected in wallet: {0}")]
    TransactionRejected(String),
    #[error("purchase of token {0} already in progress")]
    AlreadyInProgress(TokenId),
    #[error("metadata fetch for `{uri}` failed: {source}")]
    MetadataFetch {
        uri: String,
        #[source]
        source: MetadataError,
    },
    #[error("invalid market configuration: {0}")]
    InvalidConfig(ValidationError),
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProviderUnavailable => ErrorKind::ProviderUnavailable,
            Self::UserRejected(_) => ErrorKind::UserRejected,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::InvalidAccount(_) => ErrorKind::InvalidAccount,
            Self::Provider(_) => ErrorKind::Provider,
            Self::ChainRead(_) => ErrorKind::ChainRead,
            Self::ChainWrite(_) => ErrorKind::ChainWrite,
            Self::TransactionRejected(_) => ErrorKind::TransactionRejected,
            Self::AlreadyInProgress(_) => ErrorKind::AlreadyInProgress,
            Self::MetadataFetch { .. } => ErrorKind::MetadataFetch,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    /// Maps a failure of an account request (`connect`).
    pub(crate) fn from_account_request(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable => Self::ProviderUnavailable,
            ProviderError::UserRejected(message) => Self::UserRejected(message),
            other => Self::Provider(other),
        }
    }

    /// Maps a failure of a transaction submission: a declined signature is
    /// `TransactionRejected`, everything else is a write failure.
    pub(crate) fn from_submission(err: ProviderError) -> Self {
        match err {
            ProviderError::UserRejected(message) => Self::TransactionRejected(message),
            other => Self::ChainWrite(other),
        }
    }
}
