//! Pipeline driver.
//!
//! One pass over one upstream listing: for each entity, in listing order,
//! filter → resolve → (fetch → publish) per asset → record. Every entity ends
//! `Included` or `Skipped`; there is no retry state. Only a listing failure
//! aborts the pass.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, instrument, warn, Span};
use uuid::Uuid;

use super::resolver::{ResolveError, Resolver};
use crate::adapters::{AssetFetcher, ContentPublisher, FetchError, PublishError};
use crate::domain::{AssetKind, EntityKey, PublishedAsset};
use crate::library::{Catalog, CatalogError};

/// Failures that end a pass
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch {family} listing: {source}")]
    Listing {
        family: String,
        #[source]
        source: FetchError,
    },

    #[error("{family} listing has no entity array (looked for {keys})")]
    ListingShape { family: String, keys: String },

    #[error("failed to serialize {family} catalog: {source}")]
    Serialize {
        family: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Why an entity was left out of the catalog
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("excluded by filter")]
    Excluded,

    #[error("malformed record: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("{kind} download failed: {error}")]
    Fetch { kind: AssetKind, error: FetchError },

    #[error("{kind} upload failed: {error}")]
    Publish { kind: AssetKind, error: PublishError },
}

/// Terminal state of one entity
#[derive(Debug)]
pub enum EntityOutcome<T> {
    Included(T),
    Skipped(SkipReason),
}

/// A skipped entity, for the run report
#[derive(Debug)]
pub struct SkippedEntity {
    /// `None` when the record could not even be decoded
    pub key: Option<EntityKey>,
    pub reason: SkipReason,
}

/// Summary of one pass
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub family: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub included: usize,
    pub skipped: Vec<SkippedEntity>,

    /// Catalog file, once written
    pub output: Option<PathBuf>,
    pub output_written: bool,
}

impl RunReport {
    fn new(family: &str) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            family: family.to_string(),
            started_at: now,
            finished_at: now,
            included: 0,
            skipped: Vec::new(),
            output: None,
            output_written: false,
        }
    }

    /// Number of skipped entities, excluding filter hits
    pub fn failed(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| !matches!(s.reason, SkipReason::Excluded))
            .count()
    }
}

/// Drives resolvers against a fetcher and a publisher
pub struct Pipeline<'a> {
    fetcher: &'a dyn AssetFetcher,
    publisher: &'a dyn ContentPublisher,
}

impl<'a> Pipeline<'a> {
    pub fn new(fetcher: &'a dyn AssetFetcher, publisher: &'a dyn ContentPublisher) -> Self {
        Self { fetcher, publisher }
    }

    /// Run one pass over the resolver's listing
    #[instrument(skip(self, resolver), fields(family = %resolver.family(), run_id = tracing::field::Empty))]
    pub async fn run<R: Resolver>(
        &self,
        resolver: &R,
    ) -> Result<(Catalog<R::Record>, RunReport), PipelineError> {
        let mut report = RunReport::new(resolver.family());
        Span::current().record("run_id", tracing::field::display(report.run_id));
        info!(store = self.publisher.name(), "Starting pass");

        let listing = self
            .fetcher
            .fetch_json(&resolver.listing_url())
            .await
            .map_err(|source| {
                error!(error = %source, "Could not fetch listing");
                PipelineError::Listing {
                    family: resolver.family().to_string(),
                    source,
                }
            })?;

        let entities = extract_entities(listing, resolver.listing_keys()).ok_or_else(|| {
            PipelineError::ListingShape {
                family: resolver.family().to_string(),
                keys: resolver.listing_keys().join(", "),
            }
        })?;
        info!(count = entities.len(), "Listing fetched");

        let mut catalog = Catalog::new();

        for value in entities {
            let raw: R::Raw = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed record");
                    report.skipped.push(SkippedEntity {
                        key: None,
                        reason: SkipReason::Malformed(e),
                    });
                    continue;
                }
            };

            let key = resolver.key(&raw);
            match self.process_entity(resolver, &raw).await {
                EntityOutcome::Included(record) => {
                    info!(entity = %key, "Processed");
                    catalog.push(record);
                    report.included += 1;
                }
                EntityOutcome::Skipped(reason) => {
                    match reason {
                        SkipReason::Excluded => info!(entity = %key, "Excluded"),
                        ref reason => warn!(entity = %key, %reason, "Skipping"),
                    }
                    report.skipped.push(SkippedEntity {
                        key: Some(key),
                        reason,
                    });
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            included = report.included,
            skipped = report.skipped.len(),
            "Pass complete"
        );

        Ok((catalog, report))
    }

    /// Take one entity to its terminal state
    ///
    /// Assets are handled in resolver order; the first failing fetch or
    /// publish ends the entity and later assets are not attempted.
    #[instrument(skip(self, resolver, raw), fields(id = tracing::field::Empty))]
    pub async fn process_entity<R: Resolver>(
        &self,
        resolver: &R,
        raw: &R::Raw,
    ) -> EntityOutcome<R::Record> {
        let key = resolver.key(raw);
        Span::current().record("id", key.id);

        if resolver.filter().excludes(&key) {
            return EntityOutcome::Skipped(SkipReason::Excluded);
        }

        let resolved = match resolver.resolve(raw, self.fetcher).await {
            Ok(resolved) => resolved,
            Err(e) => return EntityOutcome::Skipped(e.into()),
        };

        let mut published: Vec<PublishedAsset> = Vec::with_capacity(resolved.assets.len());
        for asset in &resolved.assets {
            let bytes = match self.fetcher.fetch(&asset.source_url).await {
                Ok(bytes) if bytes.is_empty() => {
                    return EntityOutcome::Skipped(SkipReason::Fetch {
                        kind: asset.kind,
                        error: FetchError::Empty {
                            url: asset.source_url.clone(),
                        },
                    })
                }
                Ok(bytes) => bytes,
                Err(error) => {
                    return EntityOutcome::Skipped(SkipReason::Fetch {
                        kind: asset.kind,
                        error,
                    })
                }
            };

            match self
                .publisher
                .publish(asset.kind, &asset.store_path, &bytes, &asset.message)
                .await
            {
                Ok(done) => published.push(done),
                Err(error) => {
                    return EntityOutcome::Skipped(SkipReason::Publish {
                        kind: asset.kind,
                        error,
                    })
                }
            }
        }

        match resolver.build(resolved.meta, &published) {
            Ok(record) => EntityOutcome::Included(record),
            Err(e) => EntityOutcome::Skipped(e.into()),
        }
    }
}

/// Write a pass's catalog
///
/// A serialization failure is returned; a write failure is logged and
/// recorded in the report, since the published assets are still in place.
pub async fn write_catalog<T: serde::Serialize>(
    catalog: &Catalog<T>,
    path: &Path,
    report: &mut RunReport,
) -> Result<(), PipelineError> {
    report.output = Some(path.to_path_buf());

    match catalog.save(path).await {
        Ok(()) => {
            info!(path = %path.display(), records = catalog.len(), "Catalog saved");
            report.output_written = true;
            Ok(())
        }
        Err(CatalogError::Serialize(source)) => Err(PipelineError::Serialize {
            family: report.family.clone(),
            source,
        }),
        Err(e @ CatalogError::Write { .. }) => {
            error!(error = %e, "Could not save catalog");
            report.output_written = false;
            Ok(())
        }
    }
}

/// Pull the entity array out of a listing document
///
/// Accepts a bare array or an object holding the array under one of `keys`.
fn extract_entities(listing: Value, keys: &[&str]) -> Option<Vec<Value>> {
    match listing {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => keys.iter().find_map(|key| match map.remove(*key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}
