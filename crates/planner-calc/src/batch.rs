//! Batch calculation across several characters.

use crate::{aggregate, CalcError, CalculatorConfig};
use planner_core::{Catalog, ItemId, MaterialRequirement};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A requirement entry with its catalog metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMaterial {
    pub id: ItemId,
    pub name: String,
    pub icon: String,
    /// Empty when the item has no icon.
    pub icon_url: String,
    pub count: u64,
    pub rarity: u8,
}

/// Materials for one character of the batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterMaterials {
    pub name: String,
    pub items: Vec<ResolvedMaterial>,
}

/// Per-character breakdowns plus the combined total.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub per_character: Vec<CharacterMaterials>,
    pub combined: Vec<ResolvedMaterial>,
}

/// Attach catalog metadata and sort by rarity, highest first.
///
/// The sort is stable, so equal rarities keep ascending id order.
pub fn resolve_materials(
    req: &MaterialRequirement,
    catalog: &Catalog,
    icon_url: &dyn Fn(&str) -> String,
) -> Vec<ResolvedMaterial> {
    let mut items: Vec<ResolvedMaterial> = req
        .iter()
        .map(|(id, count)| {
            let item = catalog.resolve(id);
            let icon_url = if item.icon.is_empty() {
                String::new()
            } else {
                icon_url(&item.icon)
            };
            ResolvedMaterial {
                id,
                name: item.name,
                icon: item.icon,
                icon_url,
                count,
                rarity: item.rarity,
            }
        })
        .collect();
    items.sort_by(|a, b| b.rarity.cmp(&a.rarity));
    items
}

/// Run the aggregator over `configs` in order.
///
/// Any failing character aborts the batch so a partial total is never
/// reported.
pub fn merge_batch(
    configs: &[CalculatorConfig],
    catalog: &Catalog,
    icon_url: &dyn Fn(&str) -> String,
) -> Result<BatchResult, CalcError> {
    let mut combined = MaterialRequirement::new();
    let mut per_character = Vec::with_capacity(configs.len());
    for config in configs {
        let req = aggregate(config)?;
        combined.merge(&req);
        per_character.push(CharacterMaterials {
            name: config.character_name.clone(),
            items: resolve_materials(&req, catalog, icon_url),
        });
    }
    info!(
        characters = per_character.len(),
        distinct_items = combined.len(),
        "batch calculated"
    );
    Ok(BatchResult {
        per_character,
        combined: resolve_materials(&combined, catalog, icon_url),
    })
}
