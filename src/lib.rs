//! encore-rehost - re-host game art and emit JSON catalogs
//!
//! Fetches role and weapon metadata from the public game-data API, uploads
//! every image into a GitHub repository, and writes one catalog per family
//! pointing at the re-hosted copies.
//!
//! # Architecture
//!
//! One sequential pass per family:
//! - The listing is fetched once; failing that aborts the pass
//! - Each entity is filtered, resolved, then its assets are fetched and
//!   published in order
//! - An entity lands in the catalog only if every asset was published
//!
//! # Modules
//!
//! - `adapters`: External system integrations (upstream HTTP, GitHub)
//! - `core`: Resolvers, exclusion filter, pipeline driver
//! - `domain`: Data structures (raw records, assets, catalog records)
//! - `library`: Catalog output
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! export GITHUB_TOKEN=... GITHUB_USER=me REPO_NAME=game-assets
//!
//! # Both catalogs
//! encore-rehost run
//!
//! # Weapons only, into ./out
//! encore-rehost run --only weapons -o out
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod library;

// Re-export main types at crate root for convenience
pub use adapters::{AssetFetcher, ContentPublisher, GitHubPublisher, HttpFetcher};
pub use config::{ResolvedConfig, Settings, StoreConfig};
pub use crate::core::{EntityOutcome, Pipeline, RoleResolver, RunReport, SkipReason, WeaponResolver};
pub use domain::{RoleRecord, WeaponRecord};
pub use library::Catalog;
