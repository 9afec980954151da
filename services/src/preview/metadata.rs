use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Deserialize;
use thiserror::Error;

/// Description and image URL scraped from a page, as returned by the
/// metadata service.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LinkMetadata {
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("METADATA_SERVICE_URL is not configured")]
    NotConfigured,
    #[error("metadata request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("metadata service returned {0}")]
    BadStatus(reqwest::StatusCode),
}

pub trait MetadataClient: Clone + Send + Sync + 'static {
    fn fetch(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<LinkMetadata, MetadataError>> + Send;
}

/// Client for the metadata scraping service, which takes the target
/// page as a `url` query parameter and answers JSON.
#[derive(Clone)]
pub struct HttpMetadataClient {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpMetadataClient {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

impl MetadataClient for HttpMetadataClient {
    async fn fetch(&self, url: &str) -> Result<LinkMetadata, MetadataError> {
        let endpoint = self.endpoint.as_deref().ok_or(MetadataError::NotConfigured)?;
        let response = self
            .client
            .get(endpoint)
            .query(&[("url", url)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MetadataError::BadStatus(response.status()));
        }
        Ok(response.json::<LinkMetadata>().await?)
    }
}

/// Canned metadata per URL; unknown URLs fail as if the page was
/// unreachable.
#[derive(Clone, Default)]
pub struct MockMetadataClient {
    responses: Arc<RwLock<HashMap<String, LinkMetadata>>>,
}

impl MockMetadataClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_response(&self, url: impl Into<String>, metadata: LinkMetadata) {
        self.responses
            .write()
            .unwrap()
            .insert(url.into(), metadata);
    }
}

impl MetadataClient for MockMetadataClient {
    async fn fetch(&self, url: &str) -> Result<LinkMetadata, MetadataError> {
        self.responses
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(MetadataError::NotConfigured)
    }
}
