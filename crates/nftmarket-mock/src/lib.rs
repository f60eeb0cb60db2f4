//! In-memory wallet provider, marketplace contract, and metadata service for
//! tests and demos without a browser wallet or a live chain.

pub mod mock_marketplace;
pub mod mock_metadata;
pub mod mock_wallet;
pub mod scenarios;

pub use mock_marketplace::{MockMarketplace, PurchaseCall};
pub use mock_metadata::MockMetadataService;
pub use mock_wallet::MockWalletProvider;
pub use scenarios::{DemoAccounts, DemoScenario};
