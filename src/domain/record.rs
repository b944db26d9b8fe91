//! Normalized catalog records.
//!
//! Key names are part of the published JSON format consumed downstream.

use serde::{Deserialize, Serialize};

/// A role in the published catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: u32,
    pub name: String,
    pub rarity: u32,
    pub element: u32,

    #[serde(rename = "RoleHead")]
    pub role_head: String,

    #[serde(rename = "RolePortrait")]
    pub role_portrait: String,
}

/// A weapon in the published catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponRecord {
    pub id: u32,
    pub name: String,
    pub rarity: u32,

    #[serde(rename = "weaponType")]
    pub weapon_type: u32,

    #[serde(rename = "WeaponIcon")]
    pub weapon_icon: String,
}
