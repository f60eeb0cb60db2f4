//! MockMarketplace: in-memory listing table with sale semantics and a submission log.

use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::{keccak256, U256};
use async_trait::async_trait;
use nftmarket_types::{Address, MarketplaceContract, OnChainListing, ProviderError, TokenId, TxHash};
use tracing::debug;

/// One accepted `purchase` call, recorded in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseCall {
    pub buyer: Address,
    pub token_id: TokenId,
    pub payment_wei: U256,
    pub tx_hash: TxHash,
}

#[derive(Debug, Default)]
struct MarketInner {
    listings: Vec<OnChainListing>,
    submissions: Vec<PurchaseCall>,
    fail_next_read: Option<ProviderError>,
    fail_next_purchase: Option<ProviderError>,
    read_count: usize,
    purchase_attempts: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockMarketplace {
    inner: Arc<Mutex<MarketInner>>,
}

impl MockMarketplace {
    pub fn new(listings: Vec<OnChainListing>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MarketInner {
                listings,
                ..MarketInner::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MarketInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn fail_next_read(&self, err: ProviderError) {
        self.lock().fail_next_read = Some(err);
    }

    pub fn fail_next_purchase(&self, err: ProviderError) {
        self.lock().fail_next_purchase = Some(err);
    }

    pub fn submissions(&self) -> Vec<PurchaseCall> {
        self.lock().submissions.clone()
    }

    /// Every `purchase` call, including rejected ones.
    pub fn purchase_attempts(&self) -> usize {
        self.lock().purchase_attempts
    }

    pub fn read_count(&self) -> usize {
        self.lock().read_count
    }
}

#[async_trait]
impl MarketplaceContract for MockMarketplace {
    async fn fetch_active_listings(&self) -> Result<Vec<OnChainListing>, ProviderError> {
        let mut inner = self.lock();
        inner.read_count += 1;
        if let Some(err) = inner.fail_next_read.take() {
            return Err(err);
        }
        Ok(inner.listings.clone())
    }

    async fn purchase(
        &self,
        buyer: Address,
        token_id: TokenId,
        payment_wei: U256,
    ) -> Result<TxHash, ProviderError> {
        let mut inner = self.lock();
        inner.purchase_attempts += 1;
        if let Some(err) = inner.fail_next_purchase.take() {
            return Err(err);
        }

        let position = inner
            .listings
            .iter()
            .position(|listing| listing.token_id == token_id)
            .ok_or_else(|| ProviderError::Reverted(format!("token {token_id} is not listed")))?;
        if inner.listings[position].price_wei != payment_wei {
            return Err(ProviderError::Reverted(
                "Please submit the asking price in order to complete the purchase".to_string(),
            ));
        }
        inner.listings.remove(position);

        let nonce = inner.submissions.len() as u64;
        let mut preimage = Vec::with_capacity(20 + 8 + 8);
        preimage.extend_from_slice(buyer.as_bytes());
        preimage.extend_from_slice(&token_id.to_be_bytes());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let tx_hash = TxHash::new(keccak256(&preimage).0);

        debug!(%buyer, token_id, tx = %tx_hash, "mock marketplace accepted purchase");
        inner.submissions.push(PurchaseCall {
            buyer,
            token_id,
            payment_wei,
            tx_hash,
        });
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use nftmarket_types::{Address, MarketplaceContract, OnChainListing, ProviderError};

    use super::MockMarketplace;

    fn listing(token_id: u64, price: u64) -> OnChainListing {
        OnChainListing {
            token_id,
            seller: Address::new([0x0a; 20]),
            owner: Address::new([0x0b; 20]),
            price_wei: U256::from(price),
            content_uri: format!("ipfs://token-{token_id}"),
        }
    }

    #[tokio::test]
    async fn sale_removes_listing_and_logs_submission() {
        let market = MockMarketplace::new(vec![listing(1, 10), listing(2, 20)]);
        let buyer = Address::new([0x01; 20]);
        let tx = market.purchase(buyer, 1, U256::from(10u8)).await.unwrap();

        let remaining = market.fetch_active_listings().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].token_id, 2);
        let submissions = market.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].tx_hash, tx);
    }

    #[tokio::test]
    async fn reverts_on_wrong_price_or_unknown_token() {
        let market = MockMarketplace::new(vec![listing(1, 10)]);
        let buyer = Address::new([0x01; 20]);
        assert!(matches!(
            market.purchase(buyer, 1, U256::from(9u8)).await,
            Err(ProviderError::Reverted(_))
        ));
        assert!(matches!(
            market.purchase(buyer, 7, U256::from(10u8)).await,
            Err(ProviderError::Reverted(_))
        ));
        assert!(market.submissions().is_empty());
        assert_eq!(market.purchase_attempts(), 2);
    }
}
