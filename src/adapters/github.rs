//! GitHub contents API publisher.
//!
//! Objects are addressed by `(owner, repo, branch, path)`. Publishing is
//! create-or-update: look up the current blob sha on the branch, then PUT the
//! new content passing that sha when one exists, so an update always targets
//! the version we just saw.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::ContentPublisher;
use crate::config::StoreConfig;
use crate::domain::{AssetKind, PublishedAsset};

const USER_AGENT: &str = concat!("encore-rehost/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

/// Errors from a publish attempt
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("nothing to publish for {path}")]
    EmptyContent { path: String },

    #[error("request for {path} failed: {source}")]
    Transport {
        path: String,
        source: reqwest::Error,
    },

    #[error("store rejected {path} (HTTP {status}): {message}")]
    Rejected {
        path: String,
        status: u16,
        message: String,
    },
}

/// Existing object metadata (only the sha matters)
#[derive(Debug, Deserialize)]
struct ContentInfo {
    sha: String,
}

/// Body of a create-or-update request
#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Publisher backed by a GitHub repository
pub struct GitHubPublisher {
    config: StoreConfig,
    client: reqwest::Client,
}

impl GitHubPublisher {
    /// Create a publisher for the configured repository
    pub fn new(config: &StoreConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_url,
            self.config.owner,
            self.config.repo,
            path.trim_start_matches('/')
        )
    }

    /// Current blob sha of `path` on the branch
    ///
    /// `None` means "create new". A 404 is the expected case; any other
    /// lookup failure is logged and also treated as absent, leaving the PUT
    /// to report the real problem.
    pub async fn current_sha(&self, path: &str) -> Option<String> {
        let result = self
            .client
            .get(self.contents_url(path))
            .query(&[("ref", self.config.branch.as_str())])
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(path, error = %e, "Version lookup failed");
                return None;
            }
        };

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(path, "No existing object, creating");
                None
            }
            status if status.is_success() => match response.json::<ContentInfo>().await {
                Ok(info) => Some(info.sha),
                Err(e) => {
                    warn!(path, error = %e, "Unexpected version lookup response");
                    None
                }
            },
            status => {
                warn!(path, status = status.as_u16(), "Version lookup failed");
                None
            }
        }
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<String>,
    ) -> Result<(), PublishError> {
        let body = PutContents {
            message,
            content: BASE64.encode(content),
            branch: &self.config.branch,
            sha,
        };

        let response = self
            .client
            .put(self.contents_url(path))
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .json(&body)
            .send()
            .await
            .map_err(|source| PublishError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&text)
            .map(|e| e.message)
            .unwrap_or(text);

        Err(PublishError::Rejected {
            path: path.to_string(),
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ContentPublisher for GitHubPublisher {
    fn name(&self) -> &str {
        "github"
    }

    async fn publish(
        &self,
        kind: AssetKind,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<PublishedAsset, PublishError> {
        if content.is_empty() {
            return Err(PublishError::EmptyContent {
                path: path.to_string(),
            });
        }

        let sha = self.current_sha(path).await;
        let created = sha.is_none();

        if let Err(e) = self.put(path, content, message, sha).await {
            warn!(error = %e, "Upload failed");
            return Err(e);
        }

        debug!(path, created, "Published");
        Ok(PublishedAsset {
            kind,
            store_path: path.to_string(),
            public_url: self.public_url(path),
            created,
        })
    }

    fn public_url(&self, path: &str) -> String {
        self.config.public_url(path)
    }
}
