//! In-memory catalog of successfully processed entities.
//!
//! Written once, at the end of a pass, as a pretty-printed JSON array.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write catalog {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Ordered records, one per included entity
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Catalog<T> {
    records: Vec<T>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Catalog<T> {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append a record (listing order is preserved)
    pub fn push(&mut self, record: T) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T: Serialize> Catalog<T> {
    /// Pretty-printed JSON array
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serialize and overwrite `path`
    pub async fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let content = self.to_json()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| CatalogError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        fs::write(path, content)
            .await
            .map_err(|source| CatalogError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}
