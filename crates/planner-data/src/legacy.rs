//! Legacy feed of script files.
//!
//! | script               | variable          | shape                          |
//! |----------------------|-------------------|--------------------------------|
//! | `avatar.js`          | `AvatarInfo`      | list of characters             |
//! | `item.js`            | `ItemInfo`        | id → item                      |
//! | `weapon.js`          | `WeaponInfo`      | list of weapons                |
//! | `avatar/{id}.js`     | `AvatarMaterials` | `Promotion[7]`, `A/E/Q[9]`     |
//! | `level_exp.js`       | `LevelEXP`        | experience curve, all characters |
//!
//! Material maps use string item ids as keys. Icons live at `icon/{ref}.png`.

use crate::script::extract_variable;
use crate::vocab::{
    element_from_code, item_rarity, parse_release, rarity_from_grade, weapon_from_code,
};
use crate::{DataError, Transport, UpstreamSource};
use planner_core::{
    check_profile_shape, is_special_character, sort_characters, Catalog, CharacterInfo,
    CharacterMaterialProfile, Item, ItemId, MaterialRequirement, WeaponInfo,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Deserialize)]
pub struct LegacyAvatar {
    #[serde(rename = "_name")]
    pub key: String,
    #[serde(rename = "_id")]
    pub id: u32,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Grade", default)]
    pub grade: u8,
    #[serde(rename = "Weapon", default)]
    pub weapon: String,
    #[serde(rename = "Element", default)]
    pub element: String,
    #[serde(rename = "Icon", default)]
    pub icon: Option<String>,
    #[serde(rename = "Release", default)]
    pub release: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LegacyItem {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Grade", default)]
    pub grade: u8,
    #[serde(rename = "Icon", default)]
    pub icon: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LegacyWeapon {
    #[serde(rename = "_id")]
    pub id: u32,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Grade", default)]
    pub grade: u8,
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(rename = "Icon", default)]
    pub icon: String,
}

type StageMap = HashMap<String, u64>;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LegacyMaterials {
    #[serde(rename = "Promotion", default)]
    pub promotion: Vec<StageMap>,
    #[serde(rename = "A", default)]
    pub basic: Vec<StageMap>,
    #[serde(rename = "E", default)]
    pub skill: Vec<StageMap>,
    #[serde(rename = "Q", default)]
    pub burst: Vec<StageMap>,
}

fn stage_requirement(stage: &StageMap) -> Result<MaterialRequirement, DataError> {
    let mut req = MaterialRequirement::new();
    for (id, count) in stage {
        let id = id.trim().parse::<u32>().map_err(|e| DataError::Decode {
            context: format!("material id `{id}`"),
            message: e.to_string(),
        })?;
        req.add(ItemId(id), *count);
    }
    Ok(req)
}

fn stages(table: &[StageMap]) -> Result<Vec<MaterialRequirement>, DataError> {
    table.iter().map(stage_requirement).collect()
}

/// Canonical profile from a legacy material record; currency is already a
/// regular entry and stage 0 is already present.
pub fn normalize_legacy_profile(
    character_id: &str,
    raw: &LegacyMaterials,
    level_exp: Option<Vec<u64>>,
) -> Result<CharacterMaterialProfile, DataError> {
    let profile = CharacterMaterialProfile {
        character_id: character_id.to_string(),
        ascension: stages(&raw.promotion)?,
        talents: [stages(&raw.basic)?, stages(&raw.skill)?, stages(&raw.burst)?],
        level_exp,
    };
    check_profile_shape(&profile)?;
    Ok(profile)
}

pub fn normalize_legacy_avatar(raw: &LegacyAvatar) -> CharacterInfo {
    CharacterInfo {
        id: raw.id,
        key: raw.key.clone(),
        display_name: raw.name.clone(),
        icon: raw.icon.clone().unwrap_or_default(),
        rarity: rarity_from_grade(raw.grade),
        weapon: weapon_from_code(&raw.weapon),
        element: element_from_code(&raw.element),
        release: raw.release.as_deref().and_then(parse_release),
    }
}

/// Legacy script source.
pub struct LegacyScriptSource<T> {
    base_url: String,
    transport: T,
}

impl<T: Transport> LegacyScriptSource<T> {
    pub fn new(base_url: impl Into<String>, transport: T) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
        }
    }

    async fn variable<R: DeserializeOwned>(&self, path: &str, name: &str) -> Result<R, DataError> {
        let url = format!("{}/{path}", self.base_url);
        let script = self.transport.get_text(&url).await?;
        extract_variable(&script, name)
    }

    /// Shared curve; a failure only costs the experience part of a plan.
    async fn level_exp(&self) -> Option<Vec<u64>> {
        match self.variable::<Vec<u64>>("level_exp.js", "LevelEXP").await {
            Ok(table) if !table.is_empty() => Some(table),
            Ok(_) => None,
            Err(error) => {
                warn!(%error, "experience curve unavailable");
                None
            }
        }
    }
}

impl<T: Transport> UpstreamSource for LegacyScriptSource<T> {
    fn name(&self) -> &'static str {
        "legacy-script"
    }

    fn fetch_catalog(&self) -> impl Future<Output = Result<Catalog, DataError>> + Send {
        async move {
            let raw: HashMap<String, LegacyItem> = self.variable("item.js", "ItemInfo").await?;
            let items = raw.into_iter().filter_map(|(id, item)| {
                let Ok(id) = id.parse::<u32>() else {
                    debug!(id, "skipping item with non-numeric id");
                    return None;
                };
                Some(Item {
                    id: ItemId(id),
                    name: item.name,
                    icon: item.icon,
                    rarity: item_rarity(item.grade),
                })
            });
            let catalog = Catalog::new(items);
            info!(items = catalog.len(), "catalog loaded");
            Ok(catalog)
        }
    }

    fn fetch_characters(&self) -> impl Future<Output = Result<Vec<CharacterInfo>, DataError>> + Send {
        async move {
            let raw: Vec<LegacyAvatar> = self.variable("avatar.js", "AvatarInfo").await?;
            let mut list: Vec<CharacterInfo> = raw
                .iter()
                .filter(|a| !is_special_character(&a.id.to_string(), &a.key))
                .map(normalize_legacy_avatar)
                .collect();
            list.sort_by_key(|c| c.id);
            sort_characters(&mut list);
            info!(characters = list.len(), "character list loaded");
            Ok(list)
        }
    }

    fn fetch_weapons(&self) -> impl Future<Output = Result<Vec<WeaponInfo>, DataError>> + Send {
        async move {
            let raw: Vec<LegacyWeapon> = self.variable("weapon.js", "WeaponInfo").await?;
            let mut list: Vec<WeaponInfo> = raw
                .into_iter()
                .map(|w| WeaponInfo {
                    id: w.id,
                    display_name: w.name,
                    icon: w.icon,
                    rarity: item_rarity(w.grade),
                    weapon: weapon_from_code(&w.kind),
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
            let path = format!("avatar/{character_id}.js");
            let raw: LegacyMaterials = self.variable(&path, "AvatarMaterials").await?;
            let level_exp = self.level_exp().await;
            normalize_legacy_profile(character_id, &raw, level_exp)
        }
    }

    fn icon_url(&self, icon: &str) -> String {
        if icon.is_empty() {
            return String::new();
        }
        format!("{}/icon/{icon}.png", self.base_url)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use planner_core::{ValidationError, WeaponType, CURRENCY_ITEM};

    pub const BASE: &str = "https://legacy.example/gi";

    fn stage(ids: &[(u32, u64)]) -> String {
        let entries: Vec<String> = ids.iter().map(|(id, n)| format!(r#""{id}":{n}"#)).collect();
        format!("{{{}}}", entries.join(","))
    }

    pub fn materials_script(promotion_stages: usize) -> String {
        let promotion: Vec<String> = (0..promotion_stages)
            .map(|s| {
                if s == 0 {
                    "{}".to_string()
                } else {
                    stage(&[(1000 + s as u32, s as u64), (202, 20_000 * s as u64)])
                }
            })
            .collect();
        let talent = |k: u32| -> String {
            let levels: Vec<String> = (0..9).map(|n| stage(&[(2000 + 10 * k + n, 1)])).collect();
            format!("[{}]", levels.join(","))
        };
        format!(
            "var AvatarMaterials = {{\"Promotion\":[{}],\"A\":{},\"E\":{},\"Q\":{}}};",
            promotion.join(","),
            talent(0),
            talent(1),
            talent(2)
        )
    }

    #[tokio::test]
    async fn profile_with_shared_curve() {
        let mock = MockTransport::default();
        mock.route(&format!("{BASE}/avatar/10000046.js"), materials_script(7));
        mock.route(&format!("{BASE}/level_exp.js"), "var LevelEXP = [1000, 1325];");
        let src = LegacyScriptSource::new(BASE, mock.clone());
        let profile = src.fetch_profile("10000046").await.unwrap();
        assert!(profile.ascension[0].is_empty());
        assert_eq!(profile.ascension[3].get(ItemId(1003)), Some(3));
        assert_eq!(profile.ascension[3].get(CURRENCY_ITEM), Some(60_000));
        assert_eq!(profile.talents[2][8].get(ItemId(2028)), Some(1));
        assert_eq!(profile.level_exp, Some(vec![1000, 1325]));
    }

    #[tokio::test]
    async fn missing_curve_degrades_to_none() {
        let mock = MockTransport::default();
        mock.route(&format!("{BASE}/avatar/1.js"), materials_script(7));
        let profile = LegacyScriptSource::new(BASE, mock).fetch_profile("1").await.unwrap();
        assert_eq!(profile.level_exp, None);
    }

    #[tokio::test]
    async fn short_promotion_table_is_rejected() {
        let mock = MockTransport::default();
        mock.route(&format!("{BASE}/avatar/1.js"), materials_script(6));
        let err = LegacyScriptSource::new(BASE, mock).fetch_profile("1").await.unwrap_err();
        assert!(matches!(
            err,
            DataError::Validation(ValidationError::Shape { expected: 7, found: 6, .. })
        ));
    }

    #[test]
    fn non_numeric_material_ids_fail_decoding() {
        let raw: LegacyMaterials = serde_json::from_str(r#"{"Promotion":[{"mora":1}]}"#).unwrap();
        assert!(matches!(
            normalize_legacy_profile("1", &raw, None),
            Err(DataError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn character_list_from_avatar_info() {
        let mock = MockTransport::default();
        mock.route(
            &format!("{BASE}/avatar.js"),
            r#"var AvatarInfo = [
                {"_name":"Hutao","_id":10000046,"Name":"胡桃","Grade":5,"Weapon":"Pole","Element":"Fire","Icon":"UI_AvatarIcon_Hutao","Release":"2021-03-02 06:00:00"},
                {"_name":"PlayerBoy","_id":10000005,"Name":"旅行者","Grade":5,"Weapon":"Sword","Element":"Wind"},
                {"_name":"Xiangling","_id":10000023,"Name":"香菱","Grade":4,"Weapon":"Pole","Element":"Fire","Release":"2020-09-28 06:00:00"}
            ];"#,
        );
        let list = LegacyScriptSource::new(BASE, mock).fetch_characters().await.unwrap();
        let keys: Vec<&str> = list.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["Hutao", "Xiangling"]);
        assert_eq!(list[0].weapon, WeaponType::Polearm);
        assert_eq!(list[1].rarity, 4);
    }

    #[tokio::test]
    async fn catalog_and_weapons() {
        let mock = MockTransport::default();
        mock.route(
            &format!("{BASE}/item.js"),
            r#"var ItemInfo = {"104319":{"Name":"「繁荣」的哲学","Grade":4,"Icon":"UI_ItemIcon_104319"}};"#,
        );
        mock.route(
            &format!("{BASE}/weapon.js"),
            r#"var WeaponInfo = [{"_id":13501,"Name":"和璞鸢","Grade":5,"Type":"Pole","Icon":"w"},
                                 {"_id":13401,"Name":"匣里灭辰","Grade":4,"Type":"Pole","Icon":"w2"}];"#,
        );
        let src = LegacyScriptSource::new(BASE, mock);
        let catalog = src.fetch_catalog().await.unwrap();
        assert_eq!(catalog.get(ItemId(104319)).unwrap().rarity, 4);
        assert!(catalog.get(CURRENCY_ITEM).is_some());
        let weapons = src.fetch_weapons().await.unwrap();
        assert_eq!(weapons[0].id, 13501);
        assert_eq!(src.icon_url("w"), format!("{BASE}/icon/w.png"));
    }
}
