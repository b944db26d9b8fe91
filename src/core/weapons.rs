//! Weapon resolution rules.
//!
//! The listing carries engine object paths; the icon URL is the object path
//! (prefix stripped, class suffix dropped) placed into a URL template.

use async_trait::async_trait;
use reqwest::Url;

use super::filter::ExclusionFilter;
use super::resolver::{object_path, published_url, ResolveError, Resolved, Resolver};
use crate::adapters::AssetFetcher;
use crate::config::{Settings, WeaponsConfig};
use crate::domain::{AssetKind, AssetReference, EntityKey, PublishedAsset, RawWeapon, WeaponRecord};

#[derive(Debug, Clone)]
pub struct WeaponMeta {
    pub id: u32,
    pub name: String,
    pub rarity: u32,
    pub weapon_type: u32,
}

pub struct WeaponResolver {
    listing_url: String,
    config: WeaponsConfig,
    filter: ExclusionFilter,
}

impl WeaponResolver {
    pub fn new(settings: &Settings) -> Self {
        Self {
            listing_url: settings.upstream.weapon_listing_url(),
            config: settings.weapons.clone(),
            filter: ExclusionFilter::new(
                settings.weapons.skip_ids.iter().copied(),
                settings.weapons.exclude_names.iter().cloned(),
            ),
        }
    }

    /// Source URL of a weapon icon
    pub fn icon_url(&self, icon: &str) -> Result<String, ResolveError> {
        let icon = icon.trim();
        if icon.is_empty() {
            return Err(ResolveError::MissingField("Icon"));
        }
        if Url::parse(icon).is_ok() {
            return Ok(icon.to_string());
        }

        let path = object_path(icon, &self.config.strip_prefix)?;
        Ok(self.config.icon_template.replace("{path}", path))
    }
}

#[async_trait]
impl Resolver for WeaponResolver {
    type Raw = RawWeapon;
    type Meta = WeaponMeta;
    type Record = WeaponRecord;

    fn family(&self) -> &str {
        "weapons"
    }

    fn listing_url(&self) -> String {
        self.listing_url.clone()
    }

    fn listing_keys(&self) -> &[&str] {
        &["weapons", "weaponList"]
    }

    fn filter(&self) -> &ExclusionFilter {
        &self.filter
    }

    fn key(&self, raw: &RawWeapon) -> EntityKey {
        EntityKey {
            id: raw.id,
            name: raw.name.clone(),
        }
    }

    async fn resolve(
        &self,
        raw: &RawWeapon,
        _fetcher: &dyn AssetFetcher,
    ) -> Result<Resolved<WeaponMeta>, ResolveError> {
        let icon = self.icon_url(&raw.icon)?;

        Ok(Resolved {
            meta: WeaponMeta {
                id: raw.id,
                name: raw.name.clone(),
                rarity: raw.quality_id,
                weapon_type: raw.weapon_type,
            },
            assets: vec![AssetReference::new(AssetKind::WeaponIcon, raw.id, icon)],
        })
    }

    fn build(&self, meta: WeaponMeta, published: &[PublishedAsset]) -> Result<WeaponRecord, ResolveError> {
        Ok(WeaponRecord {
            id: meta.id,
            name: meta.name,
            rarity: meta.rarity,
            weapon_type: meta.weapon_type,
            weapon_icon: published_url(published, AssetKind::WeaponIcon)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_url_from_object_path() {
        let resolver = WeaponResolver::new(&Settings::default());
        let url = resolver
            .icon_url("/Game/Aki/UI/UIResources/Common/Image/IconWeapon/T_IconWeapon21010011_UI.T_IconWeapon21010011_UI")
            .unwrap();

        assert_eq!(
            url,
            "https://api.encore.moe/resource/Data/Game/Aki/UI/UIResources/Common/Image/IconWeapon/T_IconWeapon21010011_UI.png"
        );
    }

    #[test]
    fn test_icon_url_absolute_passthrough() {
        let resolver = WeaponResolver::new(&Settings::default());
        assert_eq!(
            resolver.icon_url("https://cdn.example.com/w.png").unwrap(),
            "https://cdn.example.com/w.png"
        );
    }

    #[test]
    fn test_icon_url_wrong_prefix() {
        let resolver = WeaponResolver::new(&Settings::default());
        assert!(matches!(
            resolver.icon_url("/Engine/UI/x.x"),
            Err(ResolveError::PrefixNotFound { .. })
        ));
        assert!(matches!(
            resolver.icon_url(""),
            Err(ResolveError::MissingField("Icon"))
        ));
    }

    #[test]
    fn test_listing_url() {
        let resolver = WeaponResolver::new(&Settings::default());
        assert_eq!(resolver.listing_url(), "https://api.encore.moe/en/weapon/");
    }
}
