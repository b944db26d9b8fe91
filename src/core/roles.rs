//! Role ("character") resolution rules.
//!
//! Head icons come straight from the listing. Portraits need the per-role
//! detail document and are re-sourced from the secondary provider.

use async_trait::async_trait;
use tracing::debug;

use super::filter::ExclusionFilter;
use super::resolver::{absolutize, published_url, rehost_by_marker, ResolveError, Resolved, Resolver};
use crate::adapters::AssetFetcher;
use crate::config::{PortraitConfig, Settings, UpstreamConfig};
use crate::domain::{AssetKind, AssetReference, EntityKey, PublishedAsset, RawRole, RoleDetail, RoleRecord};

/// Role fields copied into the record
#[derive(Debug, Clone)]
pub struct RoleMeta {
    pub id: u32,
    pub name: String,
    pub rarity: u32,
    pub element: u32,
}

pub struct RoleResolver {
    upstream: UpstreamConfig,
    portrait: PortraitConfig,
    filter: ExclusionFilter,
}

impl RoleResolver {
    pub fn new(settings: &Settings) -> Self {
        Self {
            upstream: settings.upstream.clone(),
            portrait: settings.roles.portrait.clone(),
            filter: ExclusionFilter::new(
                settings.roles.skip_ids.iter().copied(),
                settings.roles.exclude_names.iter().cloned(),
            ),
        }
    }

    /// Fetch the detail document and derive the portrait source URL
    async fn portrait_url(&self, id: u32, fetcher: &dyn AssetFetcher) -> Result<String, ResolveError> {
        let value = fetcher.fetch_json(&self.upstream.role_detail_url(id)).await?;
        let detail: RoleDetail =
            serde_json::from_value(value).map_err(ResolveError::MalformedDetail)?;

        let card = detail
            .formation_role_card
            .filter(|c| !c.trim().is_empty())
            .ok_or(ResolveError::MissingField("FormationRoleCard"))?;

        let source = absolutize(&card, &self.upstream.resource_base);
        rehost_by_marker(
            &source,
            &self.portrait.marker,
            &self.portrait.host,
            &self.portrait.extension,
        )
    }
}

#[async_trait]
impl Resolver for RoleResolver {
    type Raw = RawRole;
    type Meta = RoleMeta;
    type Record = RoleRecord;

    fn family(&self) -> &str {
        "roles"
    }

    fn listing_url(&self) -> String {
        self.upstream.role_listing_url()
    }

    fn listing_keys(&self) -> &[&str] {
        &["roleList"]
    }

    fn filter(&self) -> &ExclusionFilter {
        &self.filter
    }

    fn key(&self, raw: &RawRole) -> EntityKey {
        EntityKey {
            id: raw.id,
            name: raw.name.clone(),
        }
    }

    async fn resolve(
        &self,
        raw: &RawRole,
        fetcher: &dyn AssetFetcher,
    ) -> Result<Resolved<RoleMeta>, ResolveError> {
        if raw.role_head_icon.trim().is_empty() {
            return Err(ResolveError::MissingField("RoleHeadIcon"));
        }
        let head = absolutize(&raw.role_head_icon, &self.upstream.resource_base);
        let portrait = self.portrait_url(raw.id, fetcher).await?;
        debug!(id = raw.id, %head, %portrait, "Resolved role assets");

        Ok(Resolved {
            meta: RoleMeta {
                id: raw.id,
                name: raw.name.clone(),
                rarity: raw.quality_id,
                element: raw.element.id,
            },
            assets: vec![
                AssetReference::new(AssetKind::RoleHead, raw.id, head),
                AssetReference::new(AssetKind::RolePortrait, raw.id, portrait),
            ],
        })
    }

    fn build(&self, meta: RoleMeta, published: &[PublishedAsset]) -> Result<RoleRecord, ResolveError> {
        Ok(RoleRecord {
            id: meta.id,
            name: meta.name,
            rarity: meta.rarity,
            element: meta.element,
            role_head: published_url(published, AssetKind::RoleHead)?,
            role_portrait: published_url(published, AssetKind::RolePortrait)?,
        })
    }
}
