//! Core pipeline logic.
//!
//! This module contains:
//! - Resolver: the per-family rules trait and URL helpers
//! - Roles / Weapons: the two resolver implementations
//! - Filter: exclusion by id and name
//! - Pipeline: the per-entity driver

pub mod filter;
pub mod pipeline;
pub mod resolver;
pub mod roles;
pub mod weapons;

// Re-export commonly used types
pub use filter::ExclusionFilter;
pub use pipeline::{
    write_catalog, EntityOutcome, Pipeline, PipelineError, RunReport, SkipReason, SkippedEntity,
};
pub use resolver::{ResolveError, Resolved, Resolver};
pub use roles::{RoleMeta, RoleResolver};
pub use weapons::{WeaponMeta, WeaponResolver};
