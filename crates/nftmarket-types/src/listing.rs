//! Marketplace listing records: the raw on-chain shape, the off-chain metadata
//! document, and the normalized listing handed to the UI.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::ids::{Address, TokenId};
use crate::units::Denomination;

/// Listing record as returned by the marketplace contract's active-listings call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainListing {
    pub token_id: TokenId,
    pub seller: Address,
    pub owner: Address,
    #[serde(with = "decimal_u256")]
    pub price_wei: U256,
    pub content_uri: String,
}

/// Token metadata document served at a listing's content URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

/// Normalized listing: on-chain record joined with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub token_id: TokenId,
    pub seller: Address,
    pub owner: Address,
    #[serde(with = "decimal_u256")]
    pub price_wei: U256,
    /// `price_wei` rendered in whole currency units.
    pub price_display: String,
    pub name: String,
    pub description: String,
    pub image_uri: String,
    /// Set when the metadata fetch failed and the fields above are placeholders.
    pub metadata_error: Option<String>,
}

impl Listing {
    pub fn from_parts(
        record: OnChainListing,
        metadata: TokenMetadata,
        denomination: Denomination,
    ) -> Self {
        Self {
            token_id: record.token_id,
            seller: record.seller,
            owner: record.owner,
            price_display: denomination.format(record.price_wei),
            price_wei: record.price_wei,
            name: metadata.name,
            description: metadata.description,
            image_uri: metadata.image,
            metadata_error: None,
        }
    }

    /// Listing whose metadata could not be fetched; chain fields stay exact.
    pub fn incomplete(
        record: OnChainListing,
        reason: impl Into<String>,
        denomination: Denomination,
    ) -> Self {
        Self {
            metadata_error: Some(reason.into()),
            ..Self::from_parts(record, TokenMetadata::default(), denomination)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.metadata_error.is_none()
    }
}

/// Serializes a `U256` as a base-10 string so JSON consumers never see a float.
pub mod decimal_u256 {
    use alloy_primitives::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_str_radix(&raw, 10).map_err(de::Error::custom)
    }
}
