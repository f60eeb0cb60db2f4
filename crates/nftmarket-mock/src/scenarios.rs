use alloy_primitives::U256;
use nftmarket_types::{Address, ChainId, OnChainListing, TokenMetadata};

use crate::{
    mock_marketplace::MockMarketplace, mock_metadata::MockMetadataService,
    mock_wallet::MockWalletProvider,
};

/// Raw account strings as a wallet reports them (mixed case), plus parsed forms.
#[derive(Debug, Clone)]
pub struct DemoAccounts {
    pub alice_raw: String,
    pub bob_raw: String,
    pub alice: Address,
    pub bob: Address,
    pub seller: Address,
}

/// A wallet holding Alice and Bob, and a marketplace with three listings from one seller.
#[derive(Clone)]
pub struct DemoScenario {
    pub chain_id: ChainId,
    pub accounts: DemoAccounts,
    pub listings: Vec<OnChainListing>,
    pub provider: MockWalletProvider,
    pub marketplace: MockMarketplace,
    pub metadata: MockMetadataService,
}

const ALICE: &str = "0xA11CE000000000000000000000000000000A11CE";
const BOB: &str = "0xB0B0000000000000000000000000000000000B0B";
const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

impl DemoScenario {
    pub fn new(chain_id: ChainId) -> Self {
        let accounts = DemoAccounts {
            alice_raw: ALICE.to_string(),
            bob_raw: BOB.to_string(),
            alice: Address::from_hex(ALICE).unwrap_or_default(),
            bob: Address::from_hex(BOB).unwrap_or_default(),
            seller: Address::new([0x5e; 20]),
        };
        let listings = demo_listings(&accounts);

        let metadata = MockMetadataService::new();
        for (listing, (name, description)) in listings.iter().zip(DEMO_ITEMS) {
            metadata.insert(
                listing.content_uri.clone(),
                TokenMetadata {
                    name: name.to_string(),
                    description: description.to_string(),
                    image: format!("ipfs://images/{}.png", listing.token_id),
                },
            );
        }

        Self {
            chain_id,
            provider: MockWalletProvider::new(vec![
                accounts.alice_raw.clone(),
                accounts.bob_raw.clone(),
            ]),
            marketplace: MockMarketplace::new(listings.clone()),
            metadata,
            listings,
            accounts,
        }
    }
}

const DEMO_ITEMS: [(&str, &str); 3] = [
    ("Genesis Fox", "First mint of the collection"),
    ("Night Owl", "Drawn at 3am"),
    ("Tiny Whale", ""),
];

fn demo_listings(accounts: &DemoAccounts) -> Vec<OnChainListing> {
    let marketplace_escrow = Address::new([0x3a; 20]);
    [
        (1, U256::from(WEI_PER_ETHER)),
        (2, U256::from(WEI_PER_ETHER / 4)),
        (3, U256::from(WEI_PER_ETHER) * U256::from(12u8)),
    ]
    .into_iter()
    .map(|(token_id, price_wei)| OnChainListing {
        token_id,
        seller: accounts.seller,
        owner: marketplace_escrow,
        price_wei,
        content_uri: format!("ipfs://QmDemo{token_id}"),
    })
    .collect()
}
