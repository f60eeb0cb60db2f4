//! Collaborator interfaces: wallet provider, marketplace contract, metadata service.
//!
//! All three are consumed through `Arc<dyn ...>` handles injected at construction
//! time. Implementations may be browser bridges, RPC clients, or in-memory mocks.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::{MetadataError, ProviderError},
    ids::{Address, TokenId, TxHash},
    listing::{OnChainListing, TokenMetadata},
};

/// Callback invoked with the provider's raw account list on every change.
pub type AccountsHandler = Arc<dyn Fn(Vec<String>) + Send + Sync>;

/// Registration handle returned by [`WalletProvider::subscribe_accounts`].
///
/// Dropping the handle removes the listener. Call [`Subscription::unsubscribe`]
/// to make the release point explicit.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Handle for a registration that has nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// `false` when the transaction was included but reverted.
    pub success: bool,
}

/// Injected wallet agent brokering account access and transaction finality.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Whether a wallet agent is present right now.
    fn is_available(&self) -> bool;

    /// Prompts the user for account access.
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// Accounts already authorized for this origin; never prompts.
    async fn current_accounts(&self) -> Result<Vec<String>, ProviderError>;

    fn subscribe_accounts(&self, handler: AccountsHandler) -> Subscription;

    async fn await_finality(&self, tx_hash: TxHash) -> Result<TxReceipt, ProviderError>;
}

/// Marketplace contract calls used by the client.
#[async_trait]
pub trait MarketplaceContract: Send + Sync {
    async fn fetch_active_listings(&self) -> Result<Vec<OnChainListing>, ProviderError>;

    /// Payable sale call signed by `buyer`'s wallet, carrying `payment_wei` as value.
    async fn purchase(
        &self,
        buyer: Address,
        token_id: TokenId,
        payment_wei: U256,
    ) -> Result<TxHash, ProviderError>;
}

#[async_trait]
pub trait MetadataService: Send + Sync {
    async fn fetch(&self, content_uri: &str) -> Result<TokenMetadata, MetadataError>;
}
