use nftmarket_types::{Address, ChainId, Denomination, ValidationError, ETHER_DECIMALS};
use serde::{Deserialize, Serialize};

/// Deployment values the client consumes as opaque configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub marketplace_address: Address,
    pub token_contract_address: Address,
    pub rpc_endpoint: String,
    pub chain_id: ChainId,
    /// Decimal exponent used to render `price_wei`.
    pub currency_decimals: u8,
    /// Base URL `ipfs://` content URIs are resolved against.
    pub ipfs_gateway: String,
    pub metadata_timeout_ms: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            marketplace_address: Address::default(),
            token_contract_address: Address::default(),
            rpc_endpoint: "http://127.0.0.1:8545".to_string(),
            chain_id: 1337,
            currency_decimals: ETHER_DECIMALS,
            ipfs_gateway: "https://ipfs.io".to_string(),
            metadata_timeout_ms: 10_000,
        }
    }
}

impl MarketConfig {
    pub fn denomination(&self) -> Result<Denomination, ValidationError> {
        Denomination::new(self.currency_decimals)
    }
}
