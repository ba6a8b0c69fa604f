//! Structured per-character JSON API.
//!
//! Layout under the base URL:
//! - `json/character.json`: id → character info
//! - `json/character/{id}.json`: materials and the experience curve
//! - `json/item_all.json`: id → item
//! - `json/weapon.json`: id → weapon
//! - `image/{icon}.webp`: icons

use crate::config::Language;
use crate::vocab::{
    element_from_code, item_rarity, parse_release, rarity_from_code, weapon_from_code,
};
use crate::{decode_json, DataError, Transport, UpstreamSource};
use planner_core::{
    check_profile_shape, is_special_character, sort_characters, Catalog, CharacterInfo,
    CharacterMaterialProfile, Item, ItemId, MaterialRequirement, ValidationError, WeaponInfo,
    CURRENCY_ITEM,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info};

/// Localized names carried by list entries.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawNames {
    #[serde(rename = "EN", default)]
    pub en: String,
    #[serde(rename = "CHS", default)]
    pub chs: String,
    #[serde(rename = "JP", default)]
    pub jp: String,
    #[serde(rename = "KR", default)]
    pub kr: String,
}

impl RawNames {
    /// Name in `lang`, falling back to english when missing.
    pub fn pick(&self, lang: Language) -> &str {
        let name = match lang {
            Language::En => &self.en,
            Language::Chs => &self.chs,
            Language::Jp => &self.jp,
            Language::Kr => &self.kr,
        };
        if name.is_empty() {
            &self.en
        } else {
            name
        }
    }
}

/// Entry of `character.json`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawCharacterInfo {
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub rank: String,
    #[serde(default)]
    pub weapon: String,
    #[serde(default)]
    pub element: String,
    #[serde(default)]
    pub release: String,
    #[serde(flatten)]
    pub names: RawNames,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawMaterial {
    #[serde(rename = "Id")]
    pub id: u32,
    #[serde(rename = "Count")]
    pub count: u64,
}

/// One ascension stage or talent level: materials plus a currency cost.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawStage {
    #[serde(rename = "Mats", default)]
    pub mats: Vec<RawMaterial>,
    #[serde(rename = "Cost", default)]
    pub cost: u64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawMaterials {
    #[serde(rename = "Ascensions", default)]
    pub ascensions: Vec<RawStage>,
    #[serde(rename = "Talents", default)]
    pub talents: Vec<Vec<RawStage>>,
}

/// `character/{id}.json`; only the fields the planner needs.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawCharacterData {
    #[serde(rename = "Materials")]
    pub materials: Option<RawMaterials>,
    #[serde(rename = "LevelEXP", default)]
    pub level_exp: Option<Vec<u64>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawItem {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Rank", default)]
    pub rank: u8,
    #[serde(rename = "Icon", default)]
    pub icon: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawWeapon {
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub rank: u8,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub skin: bool,
    #[serde(flatten)]
    pub names: RawNames,
}

/// Canonical character info from a list entry.
pub fn normalize_character_info(
    id: u32,
    raw: &RawCharacterInfo,
    lang: Language,
) -> CharacterInfo {
    CharacterInfo {
        id,
        key: raw.names.en.clone(),
        display_name: raw.names.pick(lang).to_string(),
        icon: raw.icon.clone(),
        rarity: rarity_from_code(&raw.rank),
        weapon: weapon_from_code(&raw.weapon),
        element: element_from_code(&raw.element),
        release: parse_release(&raw.release),
    }
}

/// Fold a stage's materials and currency cost into one requirement map.
pub fn fold_stage(stage: &RawStage) -> MaterialRequirement {
    let mut req: MaterialRequirement = stage
        .mats
        .iter()
        .map(|m| (ItemId(m.id), m.count))
        .collect();
    req.add(CURRENCY_ITEM, stage.cost);
    req
}

/// Ascension stages get an empty stage 0 prepended; talents map one to one.
pub fn normalize_materials(
    ascensions: &[RawStage],
    talents: &[Vec<RawStage>],
) -> Result<(Vec<MaterialRequirement>, [Vec<MaterialRequirement>; 3]), ValidationError> {
    let mut ascension = Vec::with_capacity(ascensions.len() + 1);
    ascension.push(MaterialRequirement::new());
    ascension.extend(ascensions.iter().map(fold_stage));

    let slots: [&Vec<RawStage>; 3] = match talents {
        [basic, skill, burst] => [basic, skill, burst],
        _ => {
            return Err(ValidationError::Shape {
                character: String::new(),
                table: "talents".to_string(),
                expected: 3,
                found: talents.len(),
            })
        }
    };
    let talents: [Vec<MaterialRequirement>; 3] =
        slots.map(|levels| levels.iter().map(fold_stage).collect());
    Ok((ascension, talents))
}

/// Build and shape-check a profile from a character record.
pub fn normalize_profile(
    character_id: &str,
    raw: RawCharacterData,
) -> Result<CharacterMaterialProfile, DataError> {
    let materials = raw.materials.ok_or_else(|| DataError::Decode {
        context: format!("character {character_id}"),
        message: "record has no materials".to_string(),
    })?;
    let (ascension, talents) = normalize_materials(&materials.ascensions, &materials.talents)
        .map_err(|e| match e {
            ValidationError::Shape {
                table,
                expected,
                found,
                ..
            } => ValidationError::Shape {
                character: character_id.to_string(),
                table,
                expected,
                found,
            },
            other => other,
        })?;
    let profile = CharacterMaterialProfile {
        character_id: character_id.to_string(),
        ascension,
        talents,
        level_exp: raw.level_exp.filter(|t| !t.is_empty()),
    };
    check_profile_shape(&profile)?;
    Ok(profile)
}

/// Structured JSON source.
pub struct JsonSource<T> {
    base_url: String,
    language: Language,
    transport: T,
}

impl<T: Transport> JsonSource<T> {
    pub fn new(base_url: impl Into<String>, language: Language, transport: T) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            language,
            transport,
        }
    }

    fn json_url(&self, path: &str) -> String {
        format!("{}/json/{path}", self.base_url)
    }

    async fn get_json<R: serde::de::DeserializeOwned>(&self, path: &str) -> Result<R, DataError> {
        let text = self.transport.get_text(&self.json_url(path)).await?;
        decode_json(path, &text)
    }
}

impl<T: Transport> UpstreamSource for JsonSource<T> {
    fn name(&self) -> &'static str {
        "json"
    }

    fn fetch_catalog(&self) -> impl Future<Output = Result<Catalog, DataError>> + Send {
        async move {
            let raw: HashMap<String, RawItem> = self.get_json("item_all.json").await?;
            let items = raw.into_iter().filter_map(|(id, item)| {
                let Ok(id) = id.parse::<u32>() else {
                    debug!(id, "skipping item with non-numeric id");
                    return None;
                };
                Some(Item {
                    id: ItemId(id),
                    name: item.name,
                    icon: item.icon,
                    rarity: item_rarity(item.rank),
                })
            });
            let catalog = Catalog::new(items);
            info!(items = catalog.len(), "catalog loaded");
            Ok(catalog)
        }
    }

    fn fetch_characters(&self) -> impl Future<Output = Result<Vec<CharacterInfo>, DataError>> + Send {
        async move {
            let raw: HashMap<String, RawCharacterInfo> = self.get_json("character.json").await?;
            let mut list = Vec::with_capacity(raw.len());
            for (id, info) in &raw {
                if is_special_character(id, &info.names.en) {
                    continue;
                }
                match id.parse::<u32>() {
                    Ok(num) => list.push(normalize_character_info(num, info, self.language)),
                    Err(_) => debug!(id, "skipping character with non-numeric id"),
                }
            }
            list.sort_by_key(|c| c.id);
            sort_characters(&mut list);
            info!(characters = list.len(), "character list loaded");
            Ok(list)
        }
    }

    fn fetch_weapons(&self) -> impl Future<Output = Result<Vec<WeaponInfo>, DataError>> + Send {
        async move {
            let raw: HashMap<String, RawWeapon> = self.get_json("weapon.json").await?;
            let mut list: Vec<WeaponInfo> = raw
                .iter()
                .filter(|(_, w)| !w.skin)
                .filter_map(|(id, w)| {
                    Some(WeaponInfo {
                        id: id.parse().ok()?,
                        display_name: w.names.pick(self.language).to_string(),
                        icon: w.icon.clone(),
                        rarity: item_rarity(w.rank),
                        weapon: weapon_from_code(&w.kind),
                    })
                })
                .collect();
            list.sort_by(|a, b| b.rarity.cmp(&a.rarity).then(a.id.cmp(&b.id)));
            info!(weapons = list.len(), "weapon list loaded");
            Ok(list)
        }
    }

    fn fetch_profile(
        &self,
        character_id: &str,
    ) -> impl Future<Output = Result<CharacterMaterialProfile, DataError>> + Send {
        async move {
            let raw: RawCharacterData = self
                .get_json(&format!("character/{character_id}.json"))
                .await?;
            normalize_profile(character_id, raw)
        }
    }

    fn icon_url(&self, icon: &str) -> String {
        if icon.is_empty() {
            return String::new();
        }
        format!("{}/image/{icon}.webp", self.base_url)
    }
}
