//! Adapter interfaces for external systems.
//!
//! Two seams: the upstream HTTP API ([`AssetFetcher`]) and the content store
//! ([`ContentPublisher`]). The pipeline only talks to these traits.

pub mod github;
pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{AssetKind, PublishedAsset};

pub use github::{GitHubPublisher, PublishError};
pub use http::{FetchError, HttpFetcher};

/// Retrieves resources from upstream
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Single GET returning the raw body
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// GET and decode as JSON
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let bytes = self.fetch(url).await?;
        serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Writes named binary objects into a versioned store
#[async_trait]
pub trait ContentPublisher: Send + Sync {
    /// Human-readable store name
    fn name(&self) -> &str;

    /// Create or update the object at `path`
    async fn publish(
        &self,
        kind: AssetKind,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<PublishedAsset, PublishError>;

    /// Public URL an object at `path` is served from
    fn public_url(&self, path: &str) -> String;
}
