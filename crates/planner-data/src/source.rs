//! The upstream adapter interface.

use crate::{DataError, JsonSource, LegacyScriptSource, Transport};
use planner_core::{Catalog, CharacterInfo, CharacterMaterialProfile, WeaponInfo};
use std::future::Future;

/// One upstream schema, normalized into canonical shapes.
///
/// Calculations only ever see the canonical types, never a vendor schema.
pub trait UpstreamSource: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Item catalog, including the built-in fallback entries.
    fn fetch_catalog(&self) -> impl Future<Output = Result<Catalog, DataError>> + Send;

    /// Playable characters, special entries removed, unreleased first.
    fn fetch_characters(&self) -> impl Future<Output = Result<Vec<CharacterInfo>, DataError>> + Send;

    fn fetch_weapons(&self) -> impl Future<Output = Result<Vec<WeaponInfo>, DataError>> + Send;

    /// Material tables for one character. Rejects malformed shapes.
    fn fetch_profile(
        &self,
        character_id: &str,
    ) -> impl Future<Output = Result<CharacterMaterialProfile, DataError>> + Send;

    /// URL of an icon reference; empty for an empty reference.
    fn icon_url(&self, icon: &str) -> String;
}

/// Source picked at runtime from configuration.
pub enum ConfiguredSource<T> {
    Json(JsonSource<T>),
    Legacy(LegacyScriptSource<T>),
}

impl<T: Transport> UpstreamSource for ConfiguredSource<T> {
    fn name(&self) -> &'static str {
        match self {
            ConfiguredSource::Json(s) => s.name(),
            ConfiguredSource::Legacy(s) => s.name(),
        }
    }

    fn fetch_catalog(&self) -> impl Future<Output = Result<Catalog, DataError>> + Send {
        async move {
            match self {
                ConfiguredSource::Json(s) => s.fetch_catalog().await,
                ConfiguredSource::Legacy(s) => s.fetch_catalog().await,
            }
        }
    }

    fn fetch_characters(&self) -> impl Future<Output = Result<Vec<CharacterInfo>, DataError>> + Send {
        async move {
            match self {
                ConfiguredSource::Json(s) => s.fetch_characters().await,
                ConfiguredSource::Legacy(s) => s.fetch_characters().await,
            }
        }
    }

    fn fetch_weapons(&self) -> impl Future<Output = Result<Vec<WeaponInfo>, DataError>> + Send {
        async move {
            match self {
                ConfiguredSource::Json(s) => s.fetch_weapons().await,
                ConfiguredSource::Legacy(s) => s.fetch_weapons().await,
            }
        }
    }

    fn fetch_profile(
        &self,
        character_id: &str,
    ) -> impl Future<Output = Result<CharacterMaterialProfile, DataError>> + Send {
        async move {
            match self {
                ConfiguredSource::Json(s) => s.fetch_profile(character_id).await,
                ConfiguredSource::Legacy(s) => s.fetch_profile(character_id).await,
            }
        }
    }

    fn icon_url(&self, icon: &str) -> String {
        match self {
            ConfiguredSource::Json(s) => s.icon_url(icon),
            ConfiguredSource::Legacy(s) => s.icon_url(icon),
        }
    }
}
