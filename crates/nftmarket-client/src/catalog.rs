//! ListingCatalog: active listings joined with their off-chain metadata.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use nftmarket_types::{
    Address, Denomination, Listing, MarketplaceContract, MetadataService, OnChainListing,
    ProviderError,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    error::{ErrorDescriptor, MarketError},
    session::WalletSession,
};

/// Listings from one load, tagged with the account that was viewing at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSnapshot {
    pub viewer: Option<Address>,
    pub listings: Vec<Listing>,
}

/// Load state published to UI bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum CatalogState {
    #[default]
    NotLoaded,
    Loading,
    Loaded(CatalogSnapshot),
    Failed(ErrorDescriptor),
}

/// Reads listings on demand. Nothing is cached between loads: each call
/// re-queries the contract and every content URI.
pub struct ListingCatalog {
    marketplace: Arc<dyn MarketplaceContract>,
    metadata: Arc<dyn MetadataService>,
    session: Arc<WalletSession>,
    denomination: Denomination,
    state: watch::Sender<CatalogState>,
    latest_load: Mutex<u64>,
}

impl ListingCatalog {
    pub fn new(
        marketplace: Arc<dyn MarketplaceContract>,
        metadata: Arc<dyn MetadataService>,
        session: Arc<WalletSession>,
        denomination: Denomination,
    ) -> Self {
        let (state, _) = watch::channel(CatalogState::NotLoaded);
        Self {
            marketplace,
            metadata,
            session,
            denomination,
            state,
            latest_load: Mutex::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    /// Loads every active listing in contract order.
    ///
    /// A failed contract query fails the whole call. A failed metadata fetch
    /// only marks its own listing incomplete.
    pub async fn load_listings(&self) -> Result<Vec<Listing>, MarketError> {
        let load = self.begin_load();
        let viewer = self.session.current_state().account();
        self.publish(load, CatalogState::Loading);

        let records = match self.marketplace.fetch_active_listings().await {
            Ok(records) => records,
            Err(err) => return Err(self.fail(load, MarketError::ChainRead(err))),
        };
        if let Some(token_id) = first_duplicate(&records) {
            let err = MarketError::ChainRead(ProviderError::Internal(format!(
                "active listings returned token {token_id} more than once"
            )));
            return Err(self.fail(load, err));
        }

        let fetched = join_all(
            records
                .iter()
                .map(|record| self.metadata.fetch(&record.content_uri)),
        )
        .await;

        let listings: Vec<Listing> = records
            .into_iter()
            .zip(fetched)
            .map(|(record, metadata)| match metadata {
                Ok(metadata) => Listing::from_parts(record, metadata, self.denomination),
                Err(source) => {
                    let err = MarketError::MetadataFetch {
                        uri: record.content_uri.clone(),
                        source,
                    };
                    warn!(token_id = record.token_id, error = %err, "listing metadata unavailable");
                    Listing::incomplete(record, err.to_string(), self.denomination)
                }
            })
            .collect();

        info!(
            count = listings.len(),
            incomplete = listings.iter().filter(|l| !l.is_complete()).count(),
            viewer = ?viewer,
            "listings loaded"
        );
        self.publish(
            load,
            CatalogState::Loaded(CatalogSnapshot {
                viewer,
                listings: listings.clone(),
            }),
        );
        Ok(listings)
    }

    fn begin_load(&self) -> u64 {
        let mut latest = self
            .latest_load
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *latest += 1;
        *latest
    }

    /// Publishes `state` unless a newer load has started since `load` began.
    fn publish(&self, load: u64, state: CatalogState) {
        let latest = self
            .latest_load
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *latest == load {
            self.state.send_replace(state);
        } else {
            debug!(load, latest = *latest, "dropping superseded catalog result");
        }
    }

    fn fail(&self, load: u64, err: MarketError) -> MarketError {
        warn!(error = %err, "listing load failed");
        self.publish(load, CatalogState::Failed(err.descriptor()));
        err
    }
}

fn first_duplicate(records: &[OnChainListing]) -> Option<u64> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .find(|record| !seen.insert(record.token_id))
        .map(|record| record.token_id)
}
