#![deny(warnings)]

//! Material requirement calculator.
//!
//! Given a character profile and its current/target levels, this crate
//! computes the materials needed:
//! - experience items for the level range ([`exp`])
//! - ascension materials for every breakpoint crossed
//! - talent materials for every talent level transition
//! - batch merging across several characters ([`batch`])

pub mod batch;
pub mod exp;

use planner_core::{
    check_profile_shape, validate_targets, CharacterMaterialProfile, MaterialRequirement,
    PlanTargets, TalentSlot, ValidationError,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub use batch::{merge_batch, BatchResult, CharacterMaterials, ResolvedMaterial};
pub use exp::{allocate_exp, resolve_exp_books, ExpDenomination, EXP_DENOMINATIONS};

/// Errors produced while calculating requirements.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    /// Profile shape or target range violated.
    #[error("{character}: {source}")]
    Invalid {
        character: String,
        #[source]
        source: ValidationError,
    },
}

/// Upper level of each ascension band; the index is the phase.
const PHASE_CAPS: [u8; 6] = [20, 40, 50, 60, 70, 80];

/// Ascension phase reached at `level`.
///
/// Bands: 1-20 → 0, 21-40 → 1, 41-50 → 2, 51-60 → 3, 61-70 → 4,
/// 71-80 → 5, 81-90 → 6.
pub fn ascension_phase(level: u8) -> usize {
    PHASE_CAPS
        .iter()
        .position(|&cap| level <= cap)
        .unwrap_or(PHASE_CAPS.len())
}

/// One character to calculate: its profile and level targets.
#[derive(Clone, Debug)]
pub struct CalculatorConfig {
    /// Display name used in results.
    pub character_name: String,
    pub profile: Arc<CharacterMaterialProfile>,
    pub targets: PlanTargets,
}

/// Compute the materials for a single character.
pub fn aggregate(config: &CalculatorConfig) -> Result<MaterialRequirement, CalcError> {
    let invalid = |source| CalcError::Invalid {
        character: config.character_name.clone(),
        source,
    };
    validate_targets(&config.targets).map_err(invalid)?;
    check_profile_shape(&config.profile).map_err(invalid)?;

    let profile = &config.profile;
    let t = &config.targets;
    let mut acc = MaterialRequirement::new();

    if t.level_from < t.level_to {
        match profile.level_exp.as_deref() {
            Some(table) if !table.is_empty() => {
                acc.merge(&resolve_exp_books(t.level_from, t.level_to, table));
            }
            _ => warn!(
                character = %profile.character_id,
                "no experience table, skipping experience items"
            ),
        }
    }

    let from_phase = ascension_phase(t.level_from);
    let to_phase = ascension_phase(t.level_to);
    for stage in &profile.ascension[from_phase + 1..=to_phase.max(from_phase)] {
        acc.merge(stage);
    }

    for slot in TalentSlot::ALL {
        let i = slot.index();
        let (from, to) = (usize::from(t.talent_from[i]), usize::from(t.talent_to[i]));
        for level in from..to {
            acc.merge(&profile.talent(slot)[level - 1]);
        }
    }

    debug!(
        character = %config.character_name,
        from_phase,
        to_phase,
        items = acc.len(),
        "aggregated materials"
    );
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner_core::{
        ItemId, ASCENSION_STAGES, CURRENCY_ITEM, EXP_BOOK_LARGE, EXP_BOOK_MEDIUM,
        EXP_BOOK_SMALL, TALENT_TRANSITIONS,
    };
    use proptest::prelude::*;

    fn one(id: u32, count: u64) -> MaterialRequirement {
        std::iter::once((ItemId(id), count)).collect()
    }

    /// Stage `s` needs item 1000+s; talent slot `k` level `n` needs item 2000+10k+n.
    pub(crate) fn tagged_profile() -> CharacterMaterialProfile {
        let mut ascension = vec![MaterialRequirement::new()];
        for s in 1..ASCENSION_STAGES as u32 {
            let mut r = one(1000 + s, u64::from(s));
            r.add(CURRENCY_ITEM, 20_000 * u64::from(s));
            ascension.push(r);
        }
        let talents = std::array::from_fn(|k| {
            (0..TALENT_TRANSITIONS as u32)
                .map(|n| one(2000 + 10 * k as u32 + n, 1))
                .collect()
        });
        CharacterMaterialProfile {
            character_id: "10000002".into(),
            ascension,
            talents,
            level_exp: Some(vec![1_000; 89]),
        }
    }

    fn config(targets: PlanTargets) -> CalculatorConfig {
        CalculatorConfig {
            character_name: "Ayaka".into(),
            profile: Arc::new(tagged_profile()),
            targets,
        }
    }

    #[test]
    fn phase_boundaries() {
        assert_eq!(ascension_phase(1), 0);
        assert_eq!(ascension_phase(20), 0);
        assert_eq!(ascension_phase(21), 1);
        assert_eq!(ascension_phase(40), 1);
        assert_eq!(ascension_phase(41), 2);
        assert_eq!(ascension_phase(50), 2);
        assert_eq!(ascension_phase(51), 3);
        assert_eq!(ascension_phase(70), 4);
        assert_eq!(ascension_phase(80), 5);
        assert_eq!(ascension_phase(81), 6);
        assert_eq!(ascension_phase(90), 6);
    }

    #[test]
    fn no_change_means_no_materials() {
        let r = aggregate(&config(PlanTargets {
            level_from: 60,
            level_to: 60,
            talent_from: [6, 6, 6],
            talent_to: [6, 6, 6],
        }))
        .unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn full_build_sums_every_stage_and_transition() {
        let r = aggregate(&config(PlanTargets {
            level_from: 1,
            level_to: 90,
            talent_from: [1, 1, 1],
            talent_to: [10, 10, 10],
        }))
        .unwrap();
        for s in 1..7u32 {
            assert_eq!(r.get(ItemId(1000 + s)), Some(u64::from(s)));
        }
        for k in 0..3u32 {
            for n in 0..9u32 {
                assert_eq!(r.get(ItemId(2000 + 10 * k + n)), Some(1));
            }
        }
        // 20 000 * (1+2+..+6)
        assert_eq!(r.get(CURRENCY_ITEM), Some(420_000));
        // 89 000 exp = 4 large + 1 medium + 4 small
        assert_eq!(r.get(EXP_BOOK_LARGE), Some(4));
        assert_eq!(r.get(EXP_BOOK_MEDIUM), Some(1));
        assert_eq!(r.get(EXP_BOOK_SMALL), Some(4));
    }

    #[test]
    fn crossing_one_breakpoint_adds_one_stage() {
        let r = aggregate(&config(PlanTargets {
            level_from: 20,
            level_to: 21,
            ..PlanTargets::default()
        }))
        .unwrap();
        assert_eq!(r.get(ItemId(1001)), Some(1));
        assert_eq!(r.get(ItemId(1002)), None);
    }

    #[test]
    fn within_a_band_adds_no_stage() {
        let r = aggregate(&config(PlanTargets {
            level_from: 41,
            level_to: 50,
            ..PlanTargets::default()
        }))
        .unwrap();
        assert!((1001..1007).all(|id| r.get(ItemId(id)).is_none()));
        assert_eq!(r.get(EXP_BOOK_MEDIUM), Some(1));
        assert_eq!(r.get(EXP_BOOK_SMALL), Some(4));
    }

    #[test]
    fn talent_ranges_are_independent() {
        let r = aggregate(&config(PlanTargets {
            talent_from: [5, 1, 9],
            talent_to: [5, 3, 10],
            ..PlanTargets::default()
        }))
        .unwrap();
        assert!((2000..2010).all(|id| r.get(ItemId(id)).is_none()));
        assert_eq!(r.get(ItemId(2010)), Some(1));
        assert_eq!(r.get(ItemId(2011)), Some(1));
        assert_eq!(r.get(ItemId(2012)), None);
        assert_eq!(r.get(ItemId(2028)), Some(1));
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn missing_exp_table_is_skipped() {
        let mut profile = tagged_profile();
        profile.level_exp = None;
        let cfg = CalculatorConfig {
            character_name: "Ayaka".into(),
            profile: Arc::new(profile),
            targets: PlanTargets {
                level_from: 1,
                level_to: 30,
                ..PlanTargets::default()
            },
        };
        let r = aggregate(&cfg).unwrap();
        assert_eq!(r.get(EXP_BOOK_SMALL), None);
        assert_eq!(r.get(ItemId(1001)), Some(1));
    }

    #[test]
    fn malformed_profile_is_rejected() {
        let mut profile = tagged_profile();
        profile.talents[1].truncate(8);
        let cfg = CalculatorConfig {
            character_name: "Ayaka".into(),
            profile: Arc::new(profile),
            targets: PlanTargets::default(),
        };
        assert!(matches!(
            aggregate(&cfg),
            Err(CalcError::Invalid {
                source: ValidationError::Shape { .. },
                ..
            })
        ));
    }

    #[test]
    fn reversed_range_fails_fast() {
        let err = aggregate(&config(PlanTargets {
            level_from: 80,
            level_to: 20,
            ..PlanTargets::default()
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Ayaka"));
    }

    proptest! {
        #[test]
        fn every_level_has_one_phase(level in 1u8..=90) {
            let p = ascension_phase(level);
            prop_assert!(p <= 6);
            let bands = [(1, 20), (21, 40), (41, 50), (51, 60), (61, 70), (71, 80), (81, 90)];
            let (lo, hi) = bands[p];
            prop_assert!(lo <= level && level <= hi);
        }

        #[test]
        fn identical_targets_are_empty(level in 1u8..=90, a in 1u8..=10, b in 1u8..=10, c in 1u8..=10) {
            let r = aggregate(&config(PlanTargets {
                level_from: level,
                level_to: level,
                talent_from: [a, b, c],
                talent_to: [a, b, c],
            })).unwrap();
            prop_assert!(r.is_empty());
        }
    }
}
