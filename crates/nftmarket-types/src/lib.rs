pub mod error;
pub mod ids;
pub mod listing;
pub mod traits;
pub mod units;

pub use alloy_primitives::U256;
pub use error::{MetadataError, ProviderError, ValidationError};
pub use ids::{Address, ChainId, TokenId, TxHash};
pub use listing::{Listing, OnChainListing, TokenMetadata};
pub use traits::{
    AccountsHandler, MarketplaceContract, MetadataService, Subscription, TxReceipt, WalletProvider,
};
pub use units::{format_units, parse_units, Denomination, ETHER_DECIMALS};
