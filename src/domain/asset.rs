//! Asset references and publish outcomes.

use serde::{Deserialize, Serialize};

/// Kind of image asset an entity requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Square role head icon
    RoleHead,

    /// Formation portrait, re-hosted from the secondary provider
    RolePortrait,

    /// Weapon icon
    WeaponIcon,
}

impl AssetKind {
    /// Store directory for this kind
    pub fn directory(&self) -> &'static str {
        match self {
            AssetKind::RoleHead => "icons",
            AssetKind::RolePortrait => "portraits",
            AssetKind::WeaponIcon => "weapons",
        }
    }

    /// File extension of the published object
    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::RoleHead | AssetKind::WeaponIcon => "png",
            AssetKind::RolePortrait => "webp",
        }
    }

    /// Store path for an entity's asset of this kind
    pub fn store_path(&self, id: u32) -> String {
        format!("{}/{}.{}", self.directory(), id, self.extension())
    }

    /// Commit message used when publishing
    pub fn commit_message(&self, id: u32) -> String {
        format!("chore: upload {} {}", self, id)
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::RoleHead => write!(f, "role head"),
            AssetKind::RolePortrait => write!(f, "role portrait"),
            AssetKind::WeaponIcon => write!(f, "weapon icon"),
        }
    }
}

/// A resolved source URL and where it goes in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub kind: AssetKind,

    /// Absolute source URL
    pub source_url: String,

    /// Target path in the content store
    pub store_path: String,

    pub message: String,
}

impl AssetReference {
    /// Reference for `id` with the conventional path and message for `kind`
    pub fn new(kind: AssetKind, id: u32, source_url: impl Into<String>) -> Self {
        Self {
            kind,
            source_url: source_url.into(),
            store_path: kind.store_path(id),
            message: kind.commit_message(id),
        }
    }
}

/// A successfully published asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedAsset {
    pub kind: AssetKind,
    pub store_path: String,

    /// Stable public URL (`{host}/{owner}/{repo}/{branch}/{path}`)
    pub public_url: String,

    /// True if no previous version existed
    pub created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_paths() {
        assert_eq!(AssetKind::RoleHead.store_path(100), "icons/100.png");
        assert_eq!(AssetKind::RolePortrait.store_path(100), "portraits/100.webp");
        assert_eq!(AssetKind::WeaponIcon.store_path(21010011), "weapons/21010011.png");
    }

    #[test]
    fn test_commit_message() {
        assert_eq!(
            AssetKind::RoleHead.commit_message(1102),
            "chore: upload role head 1102"
        );
        let reference = AssetReference::new(AssetKind::RolePortrait, 7, "https://x/p.webp");
        assert_eq!(reference.message, "chore: upload role portrait 7");
        assert_eq!(reference.store_path, "portraits/7.webp");
    }
}
