//! Vendor vocabularies for rarity, element and weapon type.
//!
//! Both upstream schemas use their own codes; these tables map either
//! vocabulary onto the canonical enums. Unknown codes pass through as
//! `Other` instead of failing.

use chrono::NaiveDateTime;
use planner_core::{Element, WeaponType};
use tracing::debug;

/// Rarity used when a code is not in the table.
pub const FALLBACK_RARITY: u8 = 5;

/// Map a quality code (`QUALITY_ORANGE`, `QUALITY_PURPLE`, ...) to a rarity.
///
/// Unknown codes fall back to [`FALLBACK_RARITY`].
pub fn rarity_from_code(code: &str) -> u8 {
    match code {
        "QUALITY_ORANGE" | "QUALITY_ORANGE_SP" => 5,
        "QUALITY_PURPLE" => 4,
        other => {
            debug!(code = other, fallback = FALLBACK_RARITY, "unknown rarity code");
            FALLBACK_RARITY
        }
    }
}

/// Legacy numeric grades; anything but 4 or 5 falls back.
pub fn rarity_from_grade(grade: u8) -> u8 {
    match grade {
        4 | 5 => grade,
        other => {
            debug!(grade = other, fallback = FALLBACK_RARITY, "unknown grade");
            FALLBACK_RARITY
        }
    }
}

pub fn weapon_from_code(code: &str) -> WeaponType {
    match code {
        "WEAPON_SWORD_ONE_HAND" | "Sword" => WeaponType::Sword,
        "WEAPON_CLAYMORE" | "Claymore" => WeaponType::Claymore,
        "WEAPON_BOW" | "Bow" => WeaponType::Bow,
        "WEAPON_POLE" | "Pole" | "Polearm" => WeaponType::Polearm,
        "WEAPON_CATALYST" | "Catalyst" => WeaponType::Catalyst,
        other => WeaponType::Other(other.to_string()),
    }
}

/// Accepts both the element names and the legacy internal names
/// (`Fire`, `Water`, `Wind`, `Electric`/`Elec`, `Ice`, `Rock`, `Grass`).
pub fn element_from_code(code: &str) -> Element {
    match code {
        "Pyro" | "Fire" => Element::Pyro,
        "Hydro" | "Water" => Element::Hydro,
        "Anemo" | "Wind" => Element::Anemo,
        "Electro" | "Electric" | "Elec" => Element::Electro,
        "Cryo" | "Ice" => Element::Cryo,
        "Geo" | "Rock" => Element::Geo,
        "Dendro" | "Grass" => Element::Dendro,
        other => Element::Other(other.to_string()),
    }
}

/// Parse `2021-01-12 06:00:00` style release stamps.
pub fn parse_release(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S").ok()
}

/// Item and weapon rarity as stored upstream, kept within 1..=5.
///
/// Missing ranks deserialize as 0 and become 1, the placeholder rarity.
pub fn item_rarity(rank: u8) -> u8 {
    if !(1..=5).contains(&rank) {
        debug!(rank, "item rank out of range, clamping");
    }
    rank.clamp(1, 5)
}
