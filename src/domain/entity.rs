//! Raw upstream records.
//!
//! Field names follow the upstream API's PascalCase schema. Only the fields
//! the pipeline reads are modeled; everything else is ignored.

use serde::{Deserialize, Serialize};

/// Identity of an entity, known before any network access
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityKey {
    pub id: u32,
    pub name: String,
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.name)
    }
}

/// Element reference embedded in a role record
#[derive(Debug, Clone, Deserialize)]
pub struct ElementRef {
    #[serde(rename = "Id")]
    pub id: u32,
}

/// A role ("character") from the upstream listing
#[derive(Debug, Clone, Deserialize)]
pub struct RawRole {
    #[serde(rename = "Id", alias = "id")]
    pub id: u32,

    #[serde(rename = "Name", alias = "name")]
    pub name: String,

    /// Rarity tier
    #[serde(rename = "QualityId")]
    pub quality_id: u32,

    #[serde(rename = "Element")]
    pub element: ElementRef,

    #[serde(rename = "WeaponType", default)]
    pub weapon_type: Option<u32>,

    /// Head icon, absolute URL or path relative to the resource base
    #[serde(rename = "RoleHeadIcon")]
    pub role_head_icon: String,
}

/// Per-role detail document
#[derive(Debug, Clone, Deserialize)]
pub struct RoleDetail {
    /// Portrait path used for the formation screen
    #[serde(rename = "FormationRoleCard", default)]
    pub formation_role_card: Option<String>,
}

/// A weapon from the upstream listing
#[derive(Debug, Clone, Deserialize)]
pub struct RawWeapon {
    #[serde(rename = "Id", alias = "id")]
    pub id: u32,

    #[serde(rename = "Name", alias = "name")]
    pub name: String,

    #[serde(rename = "QualityId")]
    pub quality_id: u32,

    #[serde(rename = "WeaponType")]
    pub weapon_type: u32,

    /// Engine object path, e.g. `/Game/Aki/UI/.../T_Icon.T_Icon`
    #[serde(rename = "Icon")]
    pub icon: String,
}
