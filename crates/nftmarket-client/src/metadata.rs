//! HTTP metadata fetcher for `ipfs://` and `http(s)://` content URIs.

use std::time::Duration;

use async_trait::async_trait;
use nftmarket_types::{MetadataError, MetadataService, TokenMetadata};
use reqwest::StatusCode;
use tracing::debug;

use crate::config::MarketConfig;

const IPFS_SCHEME: &str = "ipfs://";

#[derive(Debug, Clone)]
pub struct HttpMetadataService {
    /// `reqwest::Client` is internally reference-counted; clones share the pool.
    client: reqwest::Client,
    gateway: String,
}

impl HttpMetadataService {
    pub fn new(gateway: impl Into<String>, timeout_ms: u64) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|err| MetadataError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            gateway: gateway.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &MarketConfig) -> Result<Self, MetadataError> {
        Self::new(config.ipfs_gateway.clone(), config.metadata_timeout_ms)
    }

    /// Maps a content URI to the URL actually requested.
    pub fn resolve_uri(&self, content_uri: &str) -> Result<String, MetadataError> {
        if let Some(path) = content_uri.strip_prefix(IPFS_SCHEME) {
            let path = path.strip_prefix("ipfs/").unwrap_or(path);
            if path.is_empty() {
                return Err(MetadataError::UnsupportedUri(content_uri.to_string()));
            }
            return Ok(format!("{}/ipfs/{path}", self.gateway));
        }
        if content_uri.starts_with("https://") || content_uri.starts_with("http://") {
            return Ok(content_uri.to_string());
        }
        Err(MetadataError::UnsupportedUri(content_uri.to_string()))
    }
}

#[async_trait]
impl MetadataService for HttpMetadataService {
    async fn fetch(&self, content_uri: &str) -> Result<TokenMetadata, MetadataError> {
        let url = self.resolve_uri(content_uri)?;
        debug!(%url, "fetching token metadata");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| MetadataError::Transport(err.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(MetadataError::NotFound(content_uri.to_string())),
            status if !status.is_success() => Err(MetadataError::Http {
                uri: content_uri.to_string(),
                status: status.as_u16(),
            }),
            _ => response
                .json::<TokenMetadata>()
                .await
                .map_err(|err| MetadataError::Decode(err.to_string())),
        }
    }
}
