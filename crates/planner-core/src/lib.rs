#![deny(warnings)]

//! Core domain models and invariants for the material planner.
//!
//! This crate defines the canonical, source-independent shapes used by the
//! calculator (items, catalog, ascension/talent tables, character profiles,
//! plan targets) together with validation helpers for their invariants.

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Number of ascension stages including the empty stage 0.
pub const ASCENSION_STAGES: usize = 7;
/// Number of level transitions per talent (1→2 .. 9→10).
pub const TALENT_TRANSITIONS: usize = 9;
/// Highest character level.
pub const MAX_LEVEL: u8 = 90;
/// Highest talent level.
pub const MAX_TALENT_LEVEL: u8 = 10;

/// Reserved id of the currency item folded into requirement maps.
pub const CURRENCY_ITEM: ItemId = ItemId(202);
/// Experience item worth 1 000 exp.
pub const EXP_BOOK_SMALL: ItemId = ItemId(104001);
/// Experience item worth 5 000 exp.
pub const EXP_BOOK_MEDIUM: ItemId = ItemId(104002);
/// Experience item worth 20 000 exp.
pub const EXP_BOOK_LARGE: ItemId = ItemId(104003);

/// Numeric identifier of a material/item in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog metadata for a single item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Icon reference, turned into a URL by the data source.
    pub icon: String,
    /// Rarity in [1, 5].
    pub rarity: u8,
}

impl Item {
    /// Placeholder for an id the catalog does not know yet.
    pub fn placeholder(id: ItemId) -> Self {
        Self {
            id,
            name: format!("Unknown item ({id})"),
            icon: String::new(),
            rarity: 1,
        }
    }
}

/// Entries the game guarantees to exist even when a feed omits them.
fn fallback_items() -> [Item; 4] {
    let item = |id: ItemId, name: &str, rarity: u8| Item {
        id,
        name: name.to_string(),
        icon: format!("UI_ItemIcon_{}", id.0),
        rarity,
    };
    [
        item(CURRENCY_ITEM, "Mora", 3),
        item(EXP_BOOK_SMALL, "Wanderer's Advice", 2),
        item(EXP_BOOK_MEDIUM, "Adventurer's Experience", 3),
        item(EXP_BOOK_LARGE, "Hero's Wit", 4),
    ]
}

/// Global item lookup table keyed by id.
///
/// Always contains the currency and experience items; upstream entries with
/// the same id take precedence over the built-in fallbacks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    items: HashMap<ItemId, Item>,
}

impl Catalog {
    /// Build a catalog from upstream items, adding the fallback entries.
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        let mut map: HashMap<ItemId, Item> = items.into_iter().map(|i| (i.id, i)).collect();
        for item in fallback_items() {
            map.entry(item.id).or_insert(item);
        }
        Self { items: map }
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Resolve an id, synthesizing a placeholder when it is unknown.
    pub fn resolve(&self, id: ItemId) -> Item {
        match self.items.get(&id) {
            Some(item) => item.clone(),
            None => {
                warn!(item = %id, "item missing from catalog, using placeholder");
                Item::placeholder(id)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Quantity-by-item map. Iterates in ascending item id order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialRequirement(BTreeMap<ItemId, u64>);

impl MaterialRequirement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` of `id`; zero counts are not recorded.
    pub fn add(&mut self, id: ItemId, count: u64) {
        if count == 0 {
            return;
        }
        let total = self.0.entry(id).or_insert(0);
        *total = total.saturating_add(count);
    }

    /// Point-wise addition of another requirement into this one.
    pub fn merge(&mut self, other: &MaterialRequirement) {
        for (&id, &count) in &other.0 {
            self.add(id, count);
        }
    }

    pub fn get(&self, id: ItemId) -> Option<u64> {
        self.0.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, u64)> + '_ {
        self.0.iter().map(|(&id, &count)| (id, count))
    }
}

impl FromIterator<(ItemId, u64)> for MaterialRequirement {
    fn from_iter<I: IntoIterator<Item = (ItemId, u64)>>(iter: I) -> Self {
        let mut req = MaterialRequirement::new();
        for (id, count) in iter {
            req.add(id, count);
        }
        req
    }
}

impl IntoIterator for MaterialRequirement {
    type Item = (ItemId, u64);
    type IntoIter = btree_map::IntoIter<ItemId, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Merge two requirements into a new one.
pub fn merged(a: &MaterialRequirement, b: &MaterialRequirement) -> MaterialRequirement {
    let mut out = a.clone();
    out.merge(b);
    out
}

/// The three independently levelable talents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TalentSlot {
    /// Normal attack
    Basic,
    /// Elemental skill
    Skill,
    /// Elemental burst
    Burst,
}

impl TalentSlot {
    pub const ALL: [TalentSlot; 3] = [TalentSlot::Basic, TalentSlot::Skill, TalentSlot::Burst];

    pub fn index(self) -> usize {
        match self {
            TalentSlot::Basic => 0,
            TalentSlot::Skill => 1,
            TalentSlot::Burst => 2,
        }
    }
}

/// Canonical per-character material tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterMaterialProfile {
    /// Upstream character id.
    pub character_id: String,
    /// Ascension stages, index 0 empty, 1..=6 the breakpoints.
    pub ascension: Vec<MaterialRequirement>,
    /// Talent tables in [`TalentSlot`] order, index `n-1` is transition `n → n+1`.
    pub talents: [Vec<MaterialRequirement>; 3],
    /// Experience needed for level `n → n+1` at index `n-1`. `None` when the
    /// source had no experience data for this character.
    pub level_exp: Option<Vec<u64>>,
}

impl CharacterMaterialProfile {
    pub fn talent(&self, slot: TalentSlot) -> &[MaterialRequirement] {
        &self.talents[slot.index()]
    }
}

/// Returns true when the profile has 7 ascension stages and 9 transitions per talent.
pub fn validate_profile_shape(profile: &CharacterMaterialProfile) -> bool {
    check_profile_shape(profile).is_ok()
}

/// Like [`validate_profile_shape`] but reports which table is malformed.
pub fn check_profile_shape(profile: &CharacterMaterialProfile) -> Result<(), ValidationError> {
    if profile.ascension.len() != ASCENSION_STAGES {
        return Err(ValidationError::Shape {
            character: profile.character_id.clone(),
            table: "ascension".to_string(),
            expected: ASCENSION_STAGES,
            found: profile.ascension.len(),
        });
    }
    for slot in TalentSlot::ALL {
        let len = profile.talent(slot).len();
        if len != TALENT_TRANSITIONS {
            return Err(ValidationError::Shape {
                character: profile.character_id.clone(),
                table: format!("talent {slot:?}"),
                expected: TALENT_TRANSITIONS,
                found: len,
            });
        }
    }
    Ok(())
}

/// Current and target levels of one character. Omitted fields default to 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanTargets {
    pub level_from: u8,
    pub level_to: u8,
    /// Current talent levels in [`TalentSlot`] order.
    pub talent_from: [u8; 3],
    /// Target talent levels in [`TalentSlot`] order.
    pub talent_to: [u8; 3],
}

impl Default for PlanTargets {
    fn default() -> Self {
        Self {
            level_from: 1,
            level_to: 1,
            talent_from: [1; 3],
            talent_to: [1; 3],
        }
    }
}

/// Validate level and talent ranges.
pub fn validate_targets(t: &PlanTargets) -> Result<(), ValidationError> {
    if t.level_from < 1 || t.level_to > MAX_LEVEL || t.level_from > t.level_to {
        return Err(ValidationError::LevelRange {
            from: t.level_from,
            to: t.level_to,
        });
    }
    for slot in TalentSlot::ALL {
        let (from, to) = (t.talent_from[slot.index()], t.talent_to[slot.index()]);
        if from < 1 || to > MAX_TALENT_LEVEL || from > to {
            return Err(ValidationError::TalentRange { slot, from, to });
        }
    }
    Ok(())
}

/// A planning request as submitted by a front end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Upstream character id (or key for legacy sources).
    pub character_id: String,
    #[serde(flatten)]
    pub targets: PlanTargets,
}

/// Canonical element vocabulary. Unknown upstream codes pass through.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    Pyro,
    Hydro,
    Anemo,
    Electro,
    Cryo,
    Geo,
    Dendro,
    Other(String),
}

/// Canonical weapon type vocabulary. Unknown upstream codes pass through.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponType {
    Sword,
    Claymore,
    Bow,
    Polearm,
    Catalyst,
    Other(String),
}

/// Character listing entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterInfo {
    /// Numeric id used for profile lookups.
    pub id: u32,
    /// Stable english key.
    pub key: String,
    pub display_name: String,
    pub icon: String,
    /// 4 or 5.
    pub rarity: u8,
    pub weapon: WeaponType,
    pub element: Element,
    /// Release timestamp; `None` when unknown.
    pub release: Option<NaiveDateTime>,
}

/// Weapon listing entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponInfo {
    pub id: u32,
    pub display_name: String,
    pub icon: String,
    pub rarity: u8,
    pub weapon: WeaponType,
}

/// Avatar-selector pseudo characters: composite ids like `10000005-2` or
/// english names carrying the `Player` marker.
pub fn is_special_character(id: &str, english_name: &str) -> bool {
    id.contains('-') || english_name.contains("Player")
}

/// Unreleased entries carry no date or the 1970 placeholder date.
pub fn is_released(release: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    match release {
        Some(date) if date.year() != 1970 => date <= now,
        _ => false,
    }
}

fn is_placeholder_release(release: Option<NaiveDateTime>) -> bool {
    release.map_or(true, |d| d.year() == 1970)
}

/// Order a character listing: unreleased entries first, then newest release first.
pub fn sort_characters(list: &mut [CharacterInfo]) {
    list.sort_by(|a, b| {
        let ua = is_placeholder_release(a.release);
        let ub = is_placeholder_release(b.release);
        ub.cmp(&ua).then_with(|| b.release.cmp(&a.release))
    });
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A table does not have the fixed length.
    #[error("character {character}: {table} table has {found} entries, expected {expected}")]
    Shape {
        character: String,
        table: String,
        expected: usize,
        found: usize,
    },
    /// Level bounds outside [1, 90] or reversed.
    #[error("invalid level range {from}..{to}: expected 1 <= from <= to <= 90")]
    LevelRange { from: u8, to: u8 },
    /// Talent bounds outside [1, 10] or reversed.
    #[error("invalid {slot:?} talent range {from}..{to}: expected 1 <= from <= to <= 10")]
    TalentRange { slot: TalentSlot, from: u8, to: u8 },
}
