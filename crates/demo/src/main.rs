use std::sync::Arc;

use clap::{Parser, ValueEnum};
use nftmarket_client::{HttpMetadataService, MarketClient, MarketConfig};
use nftmarket_mock::DemoScenario;
use nftmarket_types::{Address, MetadataService, TokenId};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Buyer {
    Alice,
    Bob,
}

#[derive(Parser, Debug)]
#[command(name = "nftmarket-demo", about = "Browse and buy from an in-memory NFT marketplace")]
struct Cli {
    /// Chain ID reported by the mock network.
    #[arg(long, default_value = "1337")]
    chain_id: u64,

    /// Account used to buy; `bob` switches to Bob in the wallet after connecting.
    #[arg(long, value_enum, default_value = "alice")]
    buyer: Buyer,

    /// Token to buy after the first load.
    #[arg(long, default_value = "2")]
    token_id: TokenId,

    /// Decline the first connect prompt, then retry.
    #[arg(long)]
    reject_connect: bool,

    /// Fetch metadata over HTTP through the gateway instead of the in-memory store.
    #[arg(long)]
    live_metadata: bool,

    /// IPFS gateway used with --live-metadata.
    #[arg(long, default_value = "https://ipfs.io")]
    ipfs_gateway: String,

    /// Metadata request timeout in milliseconds.
    #[arg(long, default_value = "10000")]
    metadata_timeout_ms: u64,

    /// Print the final catalog state as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let scenario = DemoScenario::new(cli.chain_id);
    let config = MarketConfig {
        marketplace_address: Address::new([0x4d; 20]),
        token_contract_address: Address::new([0x7c; 20]),
        chain_id: scenario.chain_id,
        ipfs_gateway: cli.ipfs_gateway.clone(),
        metadata_timeout_ms: cli.metadata_timeout_ms,
        ..MarketConfig::default()
    };

    let metadata: Arc<dyn MetadataService> = if cli.live_metadata {
        Arc::new(HttpMetadataService::from_config(&config)?)
    } else {
        Arc::new(scenario.metadata.clone())
    };
    let provider = scenario.provider.clone();
    let client = MarketClient::new(
        config,
        Arc::new(provider.clone()),
        Arc::new(scenario.marketplace.clone()),
        metadata,
    )?;
    client.activate().await;
    info!(connected = client.wallet_state().is_connected(), "session activated");

    let listings = client.load_listings().await?;
    for listing in &listings {
        info!(
            token_id = listing.token_id,
            name = %listing.name,
            price = %listing.price_display,
            complete = listing.is_complete(),
            "listed"
        );
    }

    if cli.reject_connect {
        provider.reject_next_request("User rejected the request.");
        if let Err(err) = client.connect().await {
            warn!(kind = ?err.kind(), error = %err, "first connect declined");
        }
    }
    let state = client.connect().await?;
    info!(account = ?state.account(), "wallet connected");
    if let Buyer::Bob = cli.buyer {
        // switch accounts in the wallet, as a user would
        provider.emit_accounts_changed(vec![
            scenario.accounts.bob_raw.clone(),
            scenario.accounts.alice_raw.clone(),
        ]);
        info!(account = ?client.wallet_state().account(), "wallet account switched");
    }

    let listing = listings
        .iter()
        .find(|listing| listing.token_id == cli.token_id)
        .ok_or_else(|| format!("token {} is not listed", cli.token_id))?;
    let attempt = client.purchase(listing).await?;
    info!(
        token_id = attempt.listing.token_id,
        tx = %attempt.tx_hash,
        block = attempt.receipt.block_number,
        "purchase confirmed"
    );

    let remaining = client.load_listings().await?;
    info!(remaining = remaining.len(), "catalog reloaded");
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&client.catalog_state())?);
    }

    client.close();
    Ok(())
}
