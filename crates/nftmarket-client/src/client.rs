//! MarketClient: facade wiring session, catalog, and purchase flow together.

use std::sync::Arc;

use nftmarket_types::{Listing, MarketplaceContract, MetadataService, TokenId, WalletProvider};

use crate::{
    catalog::{CatalogState, ListingCatalog},
    config::MarketConfig,
    error::MarketError,
    purchase::{PurchaseAttempt, PurchaseFlow, PurchaseState},
    session::{WalletSession, WalletState},
};

/// One marketplace view: a wallet session, the catalog it reads, and the flow
/// that buys from it. All three share the injected collaborators.
pub struct MarketClient {
    config: MarketConfig,
    session: Arc<WalletSession>,
    catalog: Arc<ListingCatalog>,
    purchases: PurchaseFlow,
}

impl MarketClient {
    pub fn new(
        config: MarketConfig,
        provider: Arc<dyn WalletProvider>,
        marketplace: Arc<dyn MarketplaceContract>,
        metadata: Arc<dyn MetadataService>,
    ) -> Result<Self, MarketError> {
        let denomination = config
            .denomination()
            .map_err(MarketError::InvalidConfig)?;
        let session = Arc::new(WalletSession::new(provider));
        let catalog = Arc::new(ListingCatalog::new(
            Arc::clone(&marketplace),
            metadata,
            Arc::clone(&session),
            denomination,
        ));
        let purchases = PurchaseFlow::new(Arc::clone(&session), Arc::clone(&catalog), marketplace);
        Ok(Self {
            config,
            session,
            catalog,
            purchases,
        })
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    pub fn catalog(&self) -> &Arc<ListingCatalog> {
        &self.catalog
    }

    pub fn purchases(&self) -> &PurchaseFlow {
        &self.purchases
    }

    /// Starts listening to the wallet; see [`WalletSession::activate`].
    pub async fn activate(&self) {
        self.session.activate().await;
    }

    pub async fn connect(&self) -> Result<WalletState, MarketError> {
        self.session.connect().await
    }

    pub fn wallet_state(&self) -> WalletState {
        self.session.current_state()
    }

    pub async fn load_listings(&self) -> Result<Vec<Listing>, MarketError> {
        self.catalog.load_listings().await
    }

    pub fn catalog_state(&self) -> CatalogState {
        self.catalog.state()
    }

    pub async fn purchase(&self, listing: &Listing) -> Result<PurchaseAttempt, MarketError> {
        self.purchases.purchase(listing).await
    }

    pub fn purchase_status(&self, token_id: TokenId) -> Option<PurchaseState> {
        self.purchases.status(token_id)
    }

    /// Releases the wallet listener. Dropping the client does the same.
    pub fn close(&self) {
        self.session.close();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nftmarket_mock::DemoScenario;

    use super::MarketClient;
    use crate::{
        catalog::CatalogState,
        config::MarketConfig,
        error::{ErrorKind, MarketError},
    };

    fn make_client(scenario: &DemoScenario) -> MarketClient {
        MarketClient::new(
            MarketConfig::default(),
            Arc::new(scenario.provider.clone()),
            Arc::new(scenario.marketplace.clone()),
            Arc::new(scenario.metadata.clone()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn browse_then_buy() {
        let scenario = DemoScenario::new(1337);
        let client = make_client(&scenario);
        client.activate().await;
        assert!(!client.wallet_state().is_connected());

        let listings = client.load_listings().await.unwrap();
        assert_eq!(listings.len(), 3);
        assert_eq!(listings[1].price_display, "0.25");

        let err = client.purchase(&listings[1]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);

        let state = client.connect().await.unwrap();
        assert_eq!(state.account(), Some(scenario.accounts.alice));
        let attempt = client.purchase(&listings[1]).await.unwrap();
        assert_eq!(attempt.receipt.tx_hash, attempt.tx_hash);
        assert_eq!(client.purchase_status(listings[1].token_id), None);

        let after = client.load_listings().await.unwrap();
        assert_eq!(after.len(), 2);
        assert!(matches!(client.catalog_state(), CatalogState::Loaded(_)));
    }

    #[tokio::test]
    async fn failure_descriptor_serializes_for_ui() {
        let scenario = DemoScenario::new(1337);
        let client = make_client(&scenario);
        scenario
            .provider
            .reject_next_request("User rejected the request.");

        let err = client.connect().await.unwrap_err();
        let json = serde_json::to_value(err.descriptor()).unwrap();
        assert_eq!(json["kind"], "UserRejected");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("User rejected the request."));

        client.close();
        assert_eq!(scenario.provider.listener_count(), 0);
    }

    #[test]
    fn rejects_unrepresentable_currency_decimals() {
        let scenario = DemoScenario::new(1337);
        let config = MarketConfig {
            currency_decimals: 80,
            ..MarketConfig::default()
        };
        let result = MarketClient::new(
            config,
            Arc::new(scenario.provider.clone()),
            Arc::new(scenario.marketplace.clone()),
            Arc::new(scenario.metadata.clone()),
        );
        assert!(matches!(result, Err(MarketError::InvalidConfig(_))));
    }
}
