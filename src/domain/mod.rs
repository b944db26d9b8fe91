//! Domain types for the re-hosting pipeline.
//!
//! This module contains:
//! - Raw upstream records (roles, weapons) as received from the API
//! - Asset references and publish outcomes
//! - Normalized catalog records

pub mod asset;
pub mod entity;
pub mod record;

pub use asset::{AssetKind, AssetReference, PublishedAsset};
pub use entity::{ElementRef, EntityKey, RawRole, RawWeapon, RoleDetail};
pub use record::{RoleRecord, WeaponRecord};
