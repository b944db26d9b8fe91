//! Entity resolution: from a raw upstream record to asset references.
//!
//! Each entity family implements [`Resolver`]. The URL helpers here encode
//! the upstream path layout:
//! - relative references are joined onto a resource base
//! - portraits are re-sourced by slicing the path at a marker segment
//! - weapon icons come from engine object paths (`/Game/Aki/X/Y.Y`)

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::filter::ExclusionFilter;
use crate::adapters::{AssetFetcher, FetchError};
use crate::domain::{AssetKind, AssetReference, EntityKey, PublishedAsset};

/// Why an entity's assets could not be resolved
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("marker {marker} not found in {url}")]
    MarkerNotFound { url: String, marker: String },

    #[error("prefix {prefix} not found in {path}")]
    PrefixNotFound { path: String, prefix: String },

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("detail request failed: {0}")]
    Detail(#[from] FetchError),

    #[error("malformed detail document: {0}")]
    MalformedDetail(#[source] serde_json::Error),

    #[error("no published {0}")]
    MissingAsset(AssetKind),
}

/// Output of a successful resolution
#[derive(Debug, Clone)]
pub struct Resolved<M> {
    /// Record fields known without publishing
    pub meta: M,

    /// Assets to fetch and publish, in order
    pub assets: Vec<AssetReference>,
}

/// Rules for one entity family
#[async_trait]
pub trait Resolver: Send + Sync {
    type Raw: DeserializeOwned + Send + Sync;
    type Meta: Send;
    type Record: Serialize + Send;

    /// Family name used in logs and reports
    fn family(&self) -> &str;

    /// Upstream listing endpoint
    fn listing_url(&self) -> String;

    /// Keys the entity array may live under in the listing document
    fn listing_keys(&self) -> &[&str];

    fn filter(&self) -> &ExclusionFilter;

    fn key(&self, raw: &Self::Raw) -> EntityKey;

    /// Derive metadata and asset references
    async fn resolve(
        &self,
        raw: &Self::Raw,
        fetcher: &dyn AssetFetcher,
    ) -> Result<Resolved<Self::Meta>, ResolveError>;

    /// Assemble the record once every asset is published
    fn build(
        &self,
        meta: Self::Meta,
        published: &[PublishedAsset],
    ) -> Result<Self::Record, ResolveError>;
}

/// Public URL of the published asset of `kind`
pub fn published_url(published: &[PublishedAsset], kind: AssetKind) -> Result<String, ResolveError> {
    published
        .iter()
        .find(|p| p.kind == kind)
        .map(|p| p.public_url.clone())
        .ok_or(ResolveError::MissingAsset(kind))
}

/// Make `reference` absolute, joining relative paths onto `base`
pub fn absolutize(reference: &str, base: &str) -> String {
    let reference = reference.trim();
    if Url::parse(reference).is_ok() {
        return reference.to_string();
    }

    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        reference.trim_start_matches('/')
    )
}

/// Re-source `url` from `host`, keeping the path from `marker` onward
///
/// `https://a/resource/Data/Game/Aki/UI/Img/x.png` with marker `/UI/`,
/// host `https://b/p` and extension `webp` becomes `https://b/p/UI/Img/x.webp`.
pub fn rehost_by_marker(
    url: &str,
    marker: &str,
    host: &str,
    extension: &str,
) -> Result<String, ResolveError> {
    let parsed = Url::parse(url).map_err(|e| ResolveError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let path = parsed.path();
    let start = path
        .find(marker)
        .ok_or_else(|| ResolveError::MarkerNotFound {
            url: url.to_string(),
            marker: marker.to_string(),
        })?;

    let tail = replace_extension(&path[start..], extension);
    Ok(format!(
        "{}/{}",
        host.trim_end_matches('/'),
        tail.trim_start_matches('/')
    ))
}

/// Strip `prefix` and keep everything before the first `.`
///
/// `/Game/Aki/UI/Icon/T_Sword.T_Sword` with prefix `/Game/Aki/` gives
/// `UI/Icon/T_Sword`.
pub fn object_path<'a>(path: &'a str, prefix: &str) -> Result<&'a str, ResolveError> {
    let rest = path
        .strip_prefix(prefix)
        .ok_or_else(|| ResolveError::PrefixNotFound {
            path: path.to_string(),
            prefix: prefix.to_string(),
        })?;

    let object = match rest.find('.') {
        Some(idx) => &rest[..idx],
        None => rest,
    };

    if object.is_empty() {
        return Err(ResolveError::MissingField("Icon"));
    }
    Ok(object)
}

/// Swap the last path segment's extension (or add one)
fn replace_extension(path: &str, extension: &str) -> String {
    let segment_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[segment_start..].rfind('.') {
        Some(dot) => format!("{}.{}", &path[..segment_start + dot], extension),
        None => format!("{}.{}", path, extension),
    }
}
