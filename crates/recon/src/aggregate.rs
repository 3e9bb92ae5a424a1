use std::collections::BTreeMap;

use log::{debug, warn};

use crate::key::KeyStrategy;
use crate::model::{CanonicalRow, DuplicateMergeInfo, MergedEntry, MergedSnapshot, ReconKey};

/// Group one snapshot's rows by key and sum their quantities.
///
/// The first row seen for a key is kept as the representative. Rows with no
/// usable quantity add 0 but still count toward `row_count`. Rows the
/// strategy cannot key are listed in `unkeyed_rows` and otherwise ignored.
///
/// Sums are exact and then clamped to the `i64` range, so the result does not
/// depend on row order even when it saturates.
pub fn merge_duplicates(rows: &[CanonicalRow], strategy: &KeyStrategy) -> MergedSnapshot {
    let mut entries: BTreeMap<ReconKey, MergedEntry> = BTreeMap::new();
    let mut totals: BTreeMap<ReconKey, i128> = BTreeMap::new();
    let mut unkeyed_rows = Vec::new();

    for row in rows {
        let Some(key) = strategy.key_for(row) else {
            debug!("{}: row {} has no {} key, skipped", row.source_file, row.source_row, strategy.name());
            unkeyed_rows.push(row.source_row);
            continue;
        };

        *totals.entry(key.clone()).or_insert(0) += i128::from(row.quantity_or_zero());
        let entry = entries.entry(key.clone()).or_insert_with(|| MergedEntry {
            key,
            representative: row.clone(),
            quantity: 0,
            row_count: 0,
            source_rows: Vec::new(),
        });
        entry.row_count += 1;
        entry.source_rows.push(row.source_row);
    }

    for (key, total) in totals {
        if let Some(entry) = entries.get_mut(&key) {
            entry.quantity = saturate(total);
            if i128::from(entry.quantity) != total {
                warn!("key {key}: merged quantity {total} clamped to {}", entry.quantity);
            }
        }
    }

    let duplicates: Vec<DuplicateMergeInfo> = entries
        .values()
        .filter(|e| e.row_count > 1)
        .map(|e| DuplicateMergeInfo {
            key: e.key.clone(),
            row_count: e.row_count,
            merged_quantity: e.quantity,
        })
        .collect();

    for dup in &duplicates {
        debug!(
            "key {} merged from {} rows, quantity {}",
            dup.key, dup.row_count, dup.merged_quantity
        );
    }

    MergedSnapshot {
        entries,
        duplicates,
        unkeyed_rows,
    }
}

/// Clamp an exact sum into the `i64` range.
pub(crate) fn saturate(total: i128) -> i64 {
    i64::try_from(total).unwrap_or(if total < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyPreset;
    use proptest::prelude::*;

    fn row(sku: &str, location: &str, quantity: Option<i64>, source_row: u64) -> CanonicalRow {
        CanonicalRow {
            source_file: "unit.csv".into(),
            source_row,
            source_schema: "snapshot_v1".into(),
            sku: sku.into(),
            name: format!("name-{source_row}"),
            quantity,
            location: location.into(),
            counted_on: None,
            raw: BTreeMap::new(),
            issues: Vec::new(),
        }
    }

    #[test]
    fn duplicates_are_summed() {
        let rows = vec![
            row("SKU-002", "B", Some(5), 2),
            row("SKU-002", "B", Some(7), 3),
            row("SKU-003", "B", Some(1), 4),
        ];
        let merged = merge_duplicates(&rows, &KeyStrategy::default());

        assert_eq!(merged.entries.len(), 2);
        let key = ReconKey::composite(["SKU-002", "B"]);
        let entry = &merged.entries[&key];
        assert_eq!(entry.quantity, 12);
        assert_eq!(entry.row_count, 2);
        assert_eq!(entry.source_rows, vec![2, 3]);
        assert_eq!(
            merged.duplicates,
            vec![DuplicateMergeInfo {
                key,
                row_count: 2,
                merged_quantity: 12,
            }]
        );
    }

    #[test]
    fn first_row_is_representative() {
        let rows = vec![
            row("SKU-002", "B", Some(5), 7),
            row("SKU-002", "B", Some(7), 3),
        ];
        let merged = merge_duplicates(&rows, &KeyStrategy::default());
        let entry = merged.entries.values().next().unwrap();
        assert_eq!(entry.representative.source_row, 7);
        assert_eq!(entry.representative.name, "name-7");
    }

    #[test]
    fn invalid_quantity_counts_as_zero_but_is_counted() {
        let rows = vec![row("SKU-001", "A", Some(4), 2), row("SKU-001", "A", None, 3)];
        let merged = merge_duplicates(&rows, &KeyStrategy::default());
        assert_eq!(merged.duplicates[0].row_count, 2);
        assert_eq!(merged.duplicates[0].merged_quantity, 4);
    }

    #[test]
    fn unkeyed_rows_are_reported() {
        let rows = vec![row("", "A", Some(4), 2), row("SKU-001", "A", Some(1), 3)];
        let merged = merge_duplicates(&rows, &KeyStrategy::default());
        assert_eq!(merged.unkeyed_rows, vec![2]);
        assert_eq!(merged.entries.len(), 1);
        assert!(merged.duplicates.is_empty());
    }

    #[test]
    fn strategy_decides_grouping() {
        let rows = vec![row("SKU-001", "A", Some(1), 2), row("SKU-001", "B", Some(2), 3)];
        assert_eq!(merge_duplicates(&rows, &KeyStrategy::default()).entries.len(), 2);
        let by_sku = merge_duplicates(&rows, &KeyPreset::Sku.into());
        assert_eq!(by_sku.entries.len(), 1);
        assert_eq!(by_sku.duplicates[0].merged_quantity, 3);
    }

    #[test]
    fn merged_quantity_saturates_instead_of_overflowing() {
        let rows = vec![
            row("SKU-001", "A", Some(i64::MAX), 2),
            row("SKU-001", "A", Some(1), 3),
            row("SKU-002", "A", Some(i64::MIN), 4),
            row("SKU-002", "A", Some(-1), 5),
        ];
        let merged = merge_duplicates(&rows, &KeyStrategy::default());
        assert_eq!(merged.entries[&ReconKey::composite(["SKU-001", "A"])].quantity, i64::MAX);
        assert_eq!(merged.entries[&ReconKey::composite(["SKU-002", "A"])].quantity, i64::MIN);
        assert_eq!(merged.duplicates[0].merged_quantity, i64::MAX);
    }

    #[test]
    fn saturation_does_not_depend_on_order() {
        let forward = vec![
            row("SKU-001", "A", Some(i64::MAX), 2),
            row("SKU-001", "A", Some(1), 3),
            row("SKU-001", "A", Some(-1), 4),
        ];
        let mut backward = forward.clone();
        backward.reverse();
        let strategy = KeyStrategy::default();
        let a = merge_duplicates(&forward, &strategy);
        let b = merge_duplicates(&backward, &strategy);
        assert_eq!(a.duplicates[0].merged_quantity, i64::MAX);
        assert_eq!(a.duplicates, b.duplicates);
    }

    proptest! {
        #[test]
        fn merge_is_order_independent(
            quantities in proptest::collection::vec(proptest::option::of(-50i64..50), 1..12),
            seed in any::<u64>(),
        ) {
            let rows: Vec<CanonicalRow> = quantities
                .iter()
                .enumerate()
                .map(|(i, q)| row("SKU-001", "A", *q, i as u64 + 2))
                .collect();
            let mut shuffled = rows.clone();
            // Deterministic rotation + reversal stands in for an arbitrary permutation.
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            if seed % 2 == 0 {
                shuffled.reverse();
            }

            let strategy = KeyStrategy::default();
            let a = merge_duplicates(&rows, &strategy);
            let b = merge_duplicates(&shuffled, &strategy);
            let expected: i64 = quantities.iter().map(|q| q.unwrap_or(0)).sum();

            let qa = a.entries.values().next().unwrap().quantity;
            let qb = b.entries.values().next().unwrap().quantity;
            prop_assert_eq!(qa, expected);
            prop_assert_eq!(qb, expected);
            prop_assert_eq!(a.duplicates, b.duplicates);
        }
    }
}
