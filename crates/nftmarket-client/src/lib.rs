//! Marketplace client core.
//!
//! This crate exposes:
//! - wallet connection tracking (`WalletSession`) driven by provider notifications,
//! - listing loading and normalization (`ListingCatalog`),
//! - purchase orchestration with a per-token in-flight guard (`PurchaseFlow`),
//! - an HTTP/IPFS metadata fetcher (`HttpMetadataService`),
//! - a facade wiring the three together (`MarketClient`).

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod metadata;
pub mod purchase;
pub mod session;

pub use catalog::{CatalogSnapshot, CatalogState, ListingCatalog};
pub use client::MarketClient;
pub use config::MarketConfig;
pub use error::{ErrorDescriptor, ErrorKind, MarketError};
pub use metadata::HttpMetadataService;
pub use purchase::{PurchaseAttempt, PurchaseFlow, PurchaseState};
pub use session::{WalletSession, WalletState};
