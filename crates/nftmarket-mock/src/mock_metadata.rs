use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use nftmarket_types::{MetadataError, MetadataService, TokenMetadata};

#[derive(Debug, Default)]
struct MetadataInner {
    documents: HashMap<String, TokenMetadata>,
    failures: HashMap<String, MetadataError>,
    fetched: Vec<String>,
}

/// Content-URI keyed metadata store. Unknown URIs answer `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct MockMetadataService {
    inner: Arc<Mutex<MetadataInner>>,
}

impl MockMetadataService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetadataInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, uri: impl Into<String>, metadata: TokenMetadata) {
        self.lock().documents.insert(uri.into(), metadata);
    }

    pub fn fail(&self, uri: impl Into<String>, err: MetadataError) {
        self.lock().failures.insert(uri.into(), err);
    }

    pub fn clear_failure(&self, uri: &str) {
        self.lock().failures.remove(uri);
    }

    /// URIs requested so far, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.lock().fetched.clone()
    }
}

#[async_trait]
impl MetadataService for MockMetadataService {
    async fn fetch(&self, content_uri: &str) -> Result<TokenMetadata, MetadataError> {
        let mut inner = self.lock();
        inner.fetched.push(content_uri.to_string());
        if let Some(err) = inner.failures.get(content_uri) {
            return Err(err.clone());
        }
        inner
            .documents
            .get(content_uri)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(content_uri.to_string()))
    }
}
