//! Experience-currency resolution.
//!
//! A level range is turned into a total experience figure, which is then
//! paid with experience items using strict largest-first allocation. Any
//! remainder is rounded up onto the smallest item, so the result never
//! covers less than the required experience.

use planner_core::{ItemId, MaterialRequirement, EXP_BOOK_LARGE, EXP_BOOK_MEDIUM, EXP_BOOK_SMALL};

/// An experience item and the experience it grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpDenomination {
    pub item: ItemId,
    pub exp: u64,
}

/// Experience items, largest first.
pub const EXP_DENOMINATIONS: [ExpDenomination; 3] = [
    ExpDenomination {
        item: EXP_BOOK_LARGE,
        exp: 20_000,
    },
    ExpDenomination {
        item: EXP_BOOK_MEDIUM,
        exp: 5_000,
    },
    ExpDenomination {
        item: EXP_BOOK_SMALL,
        exp: 1_000,
    },
];

/// Experience needed to go from `level_from` to `level_to`.
///
/// `level_exp[n-1]` is the cost of `n → n+1`; entries missing from the
/// table count as zero.
pub fn total_exp(level_from: u8, level_to: u8, level_exp: &[u64]) -> u64 {
    if level_from >= level_to || level_from == 0 {
        return 0;
    }
    let start = usize::from(level_from) - 1;
    let end = usize::from(level_to) - 1;
    (start..end)
        .map(|i| level_exp.get(i).copied().unwrap_or(0))
        .fold(0, u64::saturating_add)
}

/// Greedy allocation of `total` experience into items.
///
/// Returns an empty requirement for zero experience.
pub fn allocate_exp(total: u64) -> MaterialRequirement {
    let mut out = MaterialRequirement::new();
    let mut remaining = total;
    for d in EXP_DENOMINATIONS {
        let count = remaining / d.exp;
        if count > 0 {
            out.add(d.item, count);
            remaining -= count * d.exp;
        }
    }
    if remaining > 0 {
        let smallest = EXP_DENOMINATIONS[EXP_DENOMINATIONS.len() - 1];
        out.add(smallest.item, remaining.div_ceil(smallest.exp));
    }
    out
}

/// Experience items needed for a level range.
pub fn resolve_exp_books(level_from: u8, level_to: u8, level_exp: &[u64]) -> MaterialRequirement {
    allocate_exp(total_exp(level_from, level_to, level_exp))
}

/// Total experience granted by the experience items in `req`.
pub fn covered_exp(req: &MaterialRequirement) -> u64 {
    EXP_DENOMINATIONS
        .iter()
        .map(|d| req.get(d.item).unwrap_or(0).saturating_mul(d.exp))
        .fold(0, u64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_exp_is_empty() {
        assert!(allocate_exp(0).is_empty());
        assert!(resolve_exp_books(40, 40, &[100; 89]).is_empty());
        assert!(resolve_exp_books(50, 40, &[100; 89]).is_empty());
    }

    #[test]
    fn remainder_rounds_up_onto_smallest() {
        let r = allocate_exp(123_456);
        assert_eq!(r.get(EXP_BOOK_LARGE), Some(6));
        assert_eq!(r.get(EXP_BOOK_MEDIUM), None);
        assert_eq!(r.get(EXP_BOOK_SMALL), Some(4));
        assert_eq!(covered_exp(&r), 124_000);
    }

    #[test]
    fn exact_amounts_have_no_extra() {
        let r = allocate_exp(26_000);
        assert_eq!(r.get(EXP_BOOK_LARGE), Some(1));
        assert_eq!(r.get(EXP_BOOK_MEDIUM), Some(1));
        assert_eq!(r.get(EXP_BOOK_SMALL), Some(1));
        assert_eq!(covered_exp(&r), 26_000);
    }

    #[test]
    fn small_remainder_creates_smallest_entry() {
        let r = allocate_exp(20_001);
        assert_eq!(r.get(EXP_BOOK_LARGE), Some(1));
        assert_eq!(r.get(EXP_BOOK_SMALL), Some(1));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn total_uses_half_open_transition_range() {
        let table: Vec<u64> = (1..=89).collect();
        // 1→3 is transitions 1→2 and 2→3
        assert_eq!(total_exp(1, 3, &table), 1 + 2);
        assert_eq!(total_exp(89, 90, &table), 89);
        assert_eq!(total_exp(1, 90, &table), (1..=89).sum::<u64>());
    }

    #[test]
    fn short_table_counts_missing_entries_as_zero() {
        assert_eq!(total_exp(1, 90, &[500, 500]), 1_000);
        assert_eq!(total_exp(10, 20, &[]), 0);
    }

    #[test]
    fn huge_tables_saturate_instead_of_overflowing() {
        let table = [u64::MAX, u64::MAX, 1];
        assert_eq!(total_exp(1, 4, &table), u64::MAX);
        let books = allocate_exp(u64::MAX);
        assert!(covered_exp(&books) >= u64::MAX - 20_000);
    }

    proptest! {
        #[test]
        fn never_underfills(total in 0u64..50_000_000) {
            let covered = covered_exp(&allocate_exp(total));
            prop_assert!(covered >= total);
            prop_assert!(covered < total + 1_000);
        }

        #[test]
        fn never_records_zero_counts(total in 0u64..5_000_000) {
            prop_assert!(allocate_exp(total).iter().all(|(_, c)| c > 0));
        }
    }
}
