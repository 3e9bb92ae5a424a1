use std::collections::BTreeSet;

use log::info;

use crate::aggregate::{merge_duplicates, saturate};
use crate::key::KeyStrategy;
use crate::model::{
    CanonicalRow, ChangedItem, CombinedParseResult, DuplicateMergeInfo, KeyedQuantity,
    MergedSnapshot, ReconKey, ReconciliationSummary,
};

/// Reconcile two snapshots' rows under one key strategy.
///
/// Duplicates are merged per side first, then every key in the union lands in
/// exactly one bucket and gets a `delta_by_key` entry (absent side = 0).
pub fn reconcile_rows(
    snapshot_1: &[CanonicalRow],
    snapshot_2: &[CanonicalRow],
    strategy: &KeyStrategy,
) -> ReconciliationSummary {
    let side_1 = merge_duplicates(snapshot_1, strategy);
    let side_2 = merge_duplicates(snapshot_2, strategy);
    reconcile_merged(&side_1, &side_2, strategy)
}

/// Reconcile two already-merged snapshots. Both must come from `strategy`.
///
/// Deltas are clamped to the `i64` range.
pub fn reconcile_merged(
    side_1: &MergedSnapshot,
    side_2: &MergedSnapshot,
    strategy: &KeyStrategy,
) -> ReconciliationSummary {
    let all_keys: BTreeSet<&ReconKey> = side_1.entries.keys().chain(side_2.entries.keys()).collect();

    let mut summary = ReconciliationSummary::default();

    for key in all_keys {
        let q1 = side_1.entries.get(key).map(|e| e.quantity);
        let q2 = side_2.entries.get(key).map(|e| e.quantity);

        match (q1, q2) {
            (Some(quantity), None) => summary.only_in_snapshot_1.push(KeyedQuantity {
                key: key.clone(),
                quantity,
            }),
            (None, Some(quantity)) => summary.only_in_snapshot_2.push(KeyedQuantity {
                key: key.clone(),
                quantity,
            }),
            (Some(a), Some(b)) if a == b => summary.in_both_unchanged.push(key.clone()),
            (Some(a), Some(b)) => summary.in_both_changed.push(ChangedItem {
                key: key.clone(),
                snapshot_1_quantity: a,
                snapshot_2_quantity: b,
                delta: delta(a, b),
            }),
            (None, None) => unreachable!("key comes from one of the two sides"),
        }

        summary
            .delta_by_key
            .insert(key.clone(), delta(q1.unwrap_or(0), q2.unwrap_or(0)));
    }

    info!(
        "reconciled by {}: {} keys, {} unchanged, {} changed, {} only in snapshot 1, {} only in snapshot 2",
        strategy.name(),
        summary.total_keys(),
        summary.in_both_unchanged.len(),
        summary.in_both_changed.len(),
        summary.only_in_snapshot_1.len(),
        summary.only_in_snapshot_2.len(),
    );

    summary
}

fn delta(snapshot_1: i64, snapshot_2: i64) -> i64 {
    saturate(i128::from(snapshot_2) - i128::from(snapshot_1))
}

pub fn reconcile_combined_result(
    combined: &CombinedParseResult,
    strategy: &KeyStrategy,
) -> ReconciliationSummary {
    reconcile_rows(&combined.snapshot_1.rows, &combined.snapshot_2.rows, strategy)
}

/// Keys merged from more than one row within a single snapshot.
pub fn detect_merged_duplicates(
    rows: &[CanonicalRow],
    strategy: &KeyStrategy,
) -> Vec<DuplicateMergeInfo> {
    merge_duplicates(rows, strategy).duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyPreset;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn row(sku: &str, location: &str, quantity: Option<i64>) -> CanonicalRow {
        CanonicalRow {
            source_file: "unit.csv".into(),
            source_row: 2,
            source_schema: "snapshot_v1".into(),
            sku: sku.into(),
            name: format!("{sku} name"),
            quantity,
            location: location.into(),
            counted_on: None,
            raw: BTreeMap::new(),
            issues: Vec::new(),
        }
    }

    fn key(sku: &str, location: &str) -> ReconKey {
        ReconKey::composite([sku, location])
    }

    #[test]
    fn classifies_every_bucket() {
        let one = vec![
            row("SKU-001", "A", Some(10)),
            row("SKU-002", "A", Some(5)),
            row("SKU-003", "A", Some(3)),
        ];
        let two = vec![
            row("SKU-001", "A", Some(12)),
            row("SKU-002", "A", Some(5)),
            row("SKU-004", "A", Some(8)),
        ];
        let s = reconcile_rows(&one, &two, &KeyStrategy::default());

        assert_eq!(s.in_both_unchanged, vec![key("SKU-002", "A")]);
        assert_eq!(
            s.in_both_changed,
            vec![ChangedItem {
                key: key("SKU-001", "A"),
                snapshot_1_quantity: 10,
                snapshot_2_quantity: 12,
                delta: 2,
            }]
        );
        assert_eq!(
            s.only_in_snapshot_1,
            vec![KeyedQuantity { key: key("SKU-003", "A"), quantity: 3 }]
        );
        assert_eq!(
            s.only_in_snapshot_2,
            vec![KeyedQuantity { key: key("SKU-004", "A"), quantity: 8 }]
        );
        assert_eq!(s.delta_by_key.len(), 4);
        assert_eq!(s.delta_by_key[&key("SKU-002", "A")], 0);
        assert_eq!(s.delta_by_key[&key("SKU-003", "A")], -3);
        assert_eq!(s.delta_by_key[&key("SKU-004", "A")], 8);
        assert!(s.has_differences());
    }

    #[test]
    fn duplicates_merge_before_comparison() {
        let one = vec![row("SKU-002", "B", Some(5)), row("SKU-002", "B", Some(7))];
        let two = vec![row("SKU-002", "B", Some(12))];
        let s = reconcile_rows(&one, &two, &KeyStrategy::default());
        assert_eq!(s.in_both_unchanged, vec![key("SKU-002", "B")]);

        let dups = detect_merged_duplicates(&one, &KeyStrategy::default());
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].row_count, 2);
        assert_eq!(dups[0].merged_quantity, 12);
    }

    #[test]
    fn invalid_quantity_reconciles_as_zero() {
        let one = vec![row("SKU-001", "A", None)];
        let two = vec![row("SKU-001", "A", Some(4))];
        let s = reconcile_rows(&one, &two, &KeyStrategy::default());
        assert_eq!(s.in_both_changed[0].snapshot_1_quantity, 0);
        assert_eq!(s.in_both_changed[0].delta, 4);
    }

    #[test]
    fn unkeyed_rows_are_not_reconciled() {
        let one = vec![row("", "A", Some(1))];
        let s = reconcile_rows(&one, &[], &KeyStrategy::default());
        assert_eq!(s.total_keys(), 0);
        assert!(!s.has_differences());
    }

    #[test]
    fn custom_strategy_is_honored() {
        let by_location = KeyStrategy::custom("location", |r: &CanonicalRow| {
            Some(ReconKey::single(r.location.clone()))
        });
        let one = vec![row("SKU-001", "A", Some(1)), row("SKU-002", "A", Some(2))];
        let two = vec![row("SKU-009", "A", Some(3))];
        let s = reconcile_rows(&one, &two, &by_location);
        assert_eq!(s.in_both_unchanged, vec![ReconKey::single("A")]);
    }

    #[test]
    fn sku_only_strategy_collapses_locations() {
        let one = vec![row("SKU-001", "A", Some(1)), row("SKU-001", "B", Some(2))];
        let two = vec![row("SKU-001", "C", Some(3))];
        let s = reconcile_rows(&one, &two, &KeyPreset::Sku.into());
        assert_eq!(s.in_both_unchanged, vec![ReconKey::single("SKU-001")]);
        let by_warehouse = reconcile_rows(&one, &two, &KeyStrategy::default());
        assert_eq!(by_warehouse.only_in_snapshot_1.len(), 2);
        assert_eq!(by_warehouse.only_in_snapshot_2.len(), 1);
    }

    #[test]
    fn extreme_quantities_do_not_overflow() {
        let one = vec![row("SKU-001", "A", Some(i64::MIN)), row("SKU-002", "A", Some(i64::MAX))];
        let two = vec![row("SKU-001", "A", Some(1)), row("SKU-003", "A", Some(i64::MIN))];
        let s = reconcile_rows(&one, &two, &KeyStrategy::default());

        assert_eq!(s.in_both_changed[0].delta, i64::MAX);
        assert_eq!(s.delta_by_key[&key("SKU-001", "A")], i64::MAX);
        assert_eq!(s.delta_by_key[&key("SKU-002", "A")], -i64::MAX);
        assert_eq!(s.delta_by_key[&key("SKU-003", "A")], i64::MIN);
    }

    #[test]
    fn merged_sides_reconcile_like_rows() {
        let one = vec![row("SKU-002", "B", Some(5)), row("SKU-002", "B", Some(7))];
        let two = vec![row("SKU-002", "B", Some(12)), row("SKU-004", "B", Some(1))];
        let strategy = KeyStrategy::default();
        let from_merged = reconcile_merged(
            &merge_duplicates(&one, &strategy),
            &merge_duplicates(&two, &strategy),
            &strategy,
        );
        assert_eq!(from_merged, reconcile_rows(&one, &two, &strategy));
    }

    fn rows_strategy() -> impl Strategy<Value = Vec<CanonicalRow>> {
        proptest::collection::vec(
            (0u32..6, prop_oneof!["A", "B"], proptest::option::of(-20i64..20)),
            0..15,
        )
        .prop_map(|items| {
            items
                .into_iter()
                .map(|(n, loc, q)| row(&format!("SKU-{n:03}"), &loc, q))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn every_key_lands_in_exactly_one_bucket(one in rows_strategy(), two in rows_strategy()) {
            let strategy = KeyStrategy::default();
            let s = reconcile_rows(&one, &two, &strategy);

            let union: BTreeSet<ReconKey> = one
                .iter()
                .chain(two.iter())
                .filter_map(|r| strategy.key_for(r))
                .collect();

            for k in &union {
                let hits = s.in_both_unchanged.iter().filter(|x| *x == k).count()
                    + s.in_both_changed.iter().filter(|x| &x.key == k).count()
                    + s.only_in_snapshot_1.iter().filter(|x| &x.key == k).count()
                    + s.only_in_snapshot_2.iter().filter(|x| &x.key == k).count();
                prop_assert_eq!(hits, 1);
                prop_assert!(s.delta_by_key.contains_key(k));
            }
            prop_assert_eq!(s.delta_by_key.len(), union.len());
        }

        #[test]
        fn reconciling_against_itself_is_all_unchanged(rows in rows_strategy()) {
            let s = reconcile_rows(&rows, &rows, &KeyStrategy::default());
            prop_assert!(s.only_in_snapshot_1.is_empty());
            prop_assert!(s.only_in_snapshot_2.is_empty());
            prop_assert!(s.in_both_changed.is_empty());
            prop_assert_eq!(s.in_both_unchanged.len(), s.delta_by_key.len());
            prop_assert!(s.delta_by_key.values().all(|d| *d == 0));
        }
    }
}
