//! Session cache over an upstream source.

use crate::coalesce::Coalescer;
use crate::{DataError, UpstreamSource};
use planner_calc::{merge_batch, BatchResult, CalcError, CalculatorConfig};
use planner_core::{
    validate_targets, Catalog, CharacterInfo, CharacterMaterialProfile, PlanRequest, WeaponInfo,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Memoizes every upstream lookup for the session.
///
/// Concurrent requests for the same key share one upstream fetch. Failed
/// fetches are not kept. [`DataCache::clear`] drops everything.
pub struct DataCache<S> {
    source: S,
    catalog: Coalescer<(), Catalog>,
    characters: Coalescer<(), Vec<CharacterInfo>>,
    weapons: Coalescer<(), Vec<WeaponInfo>>,
    profiles: Coalescer<String, CharacterMaterialProfile>,
}

impl<S: UpstreamSource> DataCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            catalog: Coalescer::new(),
            characters: Coalescer::new(),
            weapons: Coalescer::new(),
            profiles: Coalescer::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn catalog(&self) -> Result<Arc<Catalog>, DataError> {
        self.catalog
            .get_or_fetch((), || self.source.fetch_catalog())
            .await
    }

    pub async fn characters(&self) -> Result<Arc<Vec<CharacterInfo>>, DataError> {
        self.characters
            .get_or_fetch((), || self.source.fetch_characters())
            .await
    }

    pub async fn weapons(&self) -> Result<Arc<Vec<WeaponInfo>>, DataError> {
        self.weapons
            .get_or_fetch((), || self.source.fetch_weapons())
            .await
    }

    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn profile(&self, character_id: &str) -> Result<Arc<CharacterMaterialProfile>, DataError> {
        self.profiles
            .get_or_fetch(character_id.to_string(), || {
                self.source.fetch_profile(character_id)
            })
            .await
    }

    pub fn icon_url(&self, icon: &str) -> String {
        self.source.icon_url(icon)
    }

    /// Forget every cached value.
    pub fn clear(&self) {
        self.catalog.clear();
        self.characters.clear();
        self.weapons.clear();
        self.profiles.clear();
        info!("data cache cleared");
    }

    /// Number of memoized profiles.
    pub fn cached_profiles(&self) -> usize {
        self.profiles.ready_len()
    }

    /// Display name for `character_id` in `listing`; the id itself when
    /// the listing is unavailable or does not contain it.
    fn display_name(listing: Option<&[CharacterInfo]>, character_id: &str) -> String {
        listing
            .and_then(|list| {
                list.iter()
                    .find(|c| c.id.to_string() == character_id || c.key == character_id)
            })
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| character_id.to_string())
    }

    /// Fetch everything a batch needs and run the calculation.
    ///
    /// Targets are checked before any upstream access; any failure aborts
    /// the whole batch.
    #[instrument(skip_all, fields(characters = requests.len()))]
    pub async fn plan_batch(&self, requests: &[PlanRequest]) -> Result<BatchResult, DataError> {
        for req in requests {
            validate_targets(&req.targets).map_err(|source| CalcError::Invalid {
                character: req.character_id.clone(),
                source,
            })?;
        }
        if requests.is_empty() {
            return Ok(BatchResult::default());
        }

        let catalog = self.catalog().await?;
        let listing = match self.characters().await {
            Ok(list) => Some(list),
            Err(error) => {
                warn!(%error, "character list unavailable, using ids as names");
                None
            }
        };
        let names = listing.as_deref().map(Vec::as_slice);
        let mut configs = Vec::with_capacity(requests.len());
        for req in requests {
            let profile = self.profile(&req.character_id).await?;
            configs.push(CalculatorConfig {
                character_name: Self::display_name(names, &req.character_id),
                profile,
                targets: req.targets,
            });
        }
        let icon_url = |icon: &str| self.source.icon_url(icon);
        Ok(merge_batch(&configs, &catalog, &icon_url)?)
    }
}
