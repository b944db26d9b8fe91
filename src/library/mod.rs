//! Catalog output.
//!
//! Each entity family produces one catalog file in the output directory,
//! overwritten on every run:
//!
//! ```text
//! ./
//! ├── roles.json      # [{ id, name, rarity, element, RoleHead, RolePortrait }, ...]
//! └── weapons.json    # [{ id, name, rarity, weaponType, WeaponIcon }, ...]
//! ```

pub mod catalog;

pub use catalog::{Catalog, CatalogError};
