//! PurchaseFlow: drives one marketplace sale from submission to finality.
//!
//! Lifecycle per attempt: `Submitting -> AwaitingConfirmation -> Confirmed`, or
//! `Failed` from either non-terminal state. Only the two in-flight states are
//! tracked per token; the terminal state is reported once, by the call that
//! ran the attempt (`PurchaseAttempt::state` or the returned error), and the
//! token is idle again as soon as that call returns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use nftmarket_types::{
    Listing, MarketplaceContract, ProviderError, TokenId, TxHash, TxReceipt, WalletProvider,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{catalog::ListingCatalog, error::MarketError, session::WalletSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PurchaseState {
    /// Waiting for the wallet to sign and broadcast.
    Submitting,
    /// Broadcast; waiting for finality.
    AwaitingConfirmation,
    Confirmed,
    Failed,
}

/// Result of a confirmed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseAttempt {
    pub listing: Listing,
    pub state: PurchaseState,
    pub tx_hash: TxHash,
    pub receipt: TxReceipt,
}

type InFlightMap = Arc<Mutex<HashMap<TokenId, PurchaseState>>>;

fn lock_in_flight(map: &InFlightMap) -> MutexGuard<'_, HashMap<TokenId, PurchaseState>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Per-token latch held for the duration of one attempt. Dropping it, including
/// when the caller abandons the purchase future, frees the token.
struct InFlightGuard {
    map: InFlightMap,
    token_id: TokenId,
}

impl InFlightGuard {
    fn acquire(map: &InFlightMap, token_id: TokenId) -> Result<Self, MarketError> {
        let mut in_flight = lock_in_flight(map);
        if in_flight.contains_key(&token_id) {
            return Err(MarketError::AlreadyInProgress(token_id));
        }
        in_flight.insert(token_id, PurchaseState::Submitting);
        Ok(Self {
            map: Arc::clone(map),
            token_id,
        })
    }

    fn advance(&self, state: PurchaseState) {
        lock_in_flight(&self.map).insert(self.token_id, state);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock_in_flight(&self.map).remove(&self.token_id);
    }
}

pub struct PurchaseFlow {
    session: Arc<WalletSession>,
    catalog: Arc<ListingCatalog>,
    marketplace: Arc<dyn MarketplaceContract>,
    provider: Arc<dyn WalletProvider>,
    in_flight: InFlightMap,
}

impl PurchaseFlow {
    pub fn new(
        session: Arc<WalletSession>,
        catalog: Arc<ListingCatalog>,
        marketplace: Arc<dyn MarketplaceContract>,
    ) -> Self {
        Self {
            provider: session.provider(),
            session,
            catalog,
            marketplace,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `Submitting` or `AwaitingConfirmation` while an attempt for `token_id`
    /// is running, `None` otherwise. Never a terminal state.
    pub fn status(&self, token_id: TokenId) -> Option<PurchaseState> {
        lock_in_flight(&self.in_flight).get(&token_id).copied()
    }

    /// Buys `listing` at its listed price with the connected account.
    ///
    /// Never prompts for a connection: a disconnected session fails with
    /// `NotConnected` before any contract call.
    pub async fn purchase(&self, listing: &Listing) -> Result<PurchaseAttempt, MarketError> {
        let buyer = self
            .session
            .current_state()
            .account()
            .ok_or(MarketError::NotConnected)?;
        let token_id = listing.token_id;
        let guard = InFlightGuard::acquire(&self.in_flight, token_id)?;

        info!(token_id, %buyer, price_wei = %listing.price_wei, "submitting purchase");
        let tx_hash = match self
            .marketplace
            .purchase(buyer, token_id, listing.price_wei)
            .await
        {
            Ok(tx_hash) => tx_hash,
            Err(err) => return Err(fail(&guard, MarketError::from_submission(err))),
        };

        guard.advance(PurchaseState::AwaitingConfirmation);
        info!(token_id, tx = %tx_hash, "purchase submitted; awaiting finality");
        let receipt = match self.provider.await_finality(tx_hash).await {
            Ok(receipt) if receipt.success => receipt,
            Ok(receipt) => {
                let err = MarketError::ChainWrite(ProviderError::Reverted(format!(
                    "transaction {tx_hash} reverted in block {}",
                    receipt.block_number
                )));
                return Err(fail(&guard, err));
            }
            Err(err) => return Err(fail(&guard, MarketError::ChainWrite(err))),
        };

        info!(token_id, tx = %tx_hash, block = receipt.block_number, "purchase confirmed");
        drop(guard);
        self.spawn_refresh();

        Ok(PurchaseAttempt {
            listing: listing.clone(),
            state: PurchaseState::Confirmed,
            tx_hash,
            receipt,
        })
    }

    /// Reloads the catalog in the background. The outcome is only logged.
    fn spawn_refresh(&self) {
        let catalog = Arc::clone(&self.catalog);
        tokio::spawn(async move {
            if let Err(err) = catalog.load_listings().await {
                warn!(error = %err, "catalog refresh after purchase failed");
            }
        });
    }
}

fn fail(guard: &InFlightGuard, err: MarketError) -> MarketError {
    warn!(token_id = guard.token_id, error = %err, kind = ?err.kind(), "purchase failed");
    err
}
