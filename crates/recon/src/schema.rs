//! Registry of the known snapshot header layouts.
//!
//! Matching is an exact set comparison on normalized header names so schema
//! drift fails fast instead of silently mis-mapping columns.

use std::collections::BTreeSet;

use crate::error::ReconError;
use crate::model::CanonicalField;

/// One known header layout: raw column name (normalized) -> canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDefinition {
    pub name: &'static str,
    pub columns: &'static [(&'static str, CanonicalField)],
}

impl SchemaDefinition {
    /// Canonical field for a normalized header, if this schema declares it.
    pub fn field_for(&self, normalized_header: &str) -> Option<CanonicalField> {
        self.columns
            .iter()
            .find(|(raw, _)| *raw == normalized_header)
            .map(|(_, field)| *field)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn header_set(&self) -> BTreeSet<&'static str> {
        self.columns.iter().map(|(raw, _)| *raw).collect()
    }
}

pub const SNAPSHOT_V1: SchemaDefinition = SchemaDefinition {
    name: "snapshot_v1",
    columns: &[
        ("sku", CanonicalField::Sku),
        ("name", CanonicalField::Name),
        ("quantity", CanonicalField::Quantity),
        ("location", CanonicalField::Location),
        ("last_counted", CanonicalField::CountedOn),
    ],
};

pub const SNAPSHOT_V2: SchemaDefinition = SchemaDefinition {
    name: "snapshot_v2",
    columns: &[
        ("sku", CanonicalField::Sku),
        ("product_name", CanonicalField::Name),
        ("qty", CanonicalField::Quantity),
        ("warehouse", CanonicalField::Location),
        ("updated_at", CanonicalField::CountedOn),
    ],
};

/// Checked in order. New layouts are added here, existing ones never change.
pub static REGISTRY: &[SchemaDefinition] = &[SNAPSHOT_V1, SNAPSHOT_V2];

pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Detect the schema of a header row against the built-in registry.
pub fn detect_schema<S: AsRef<str>>(headers: &[S]) -> Result<&'static SchemaDefinition, ReconError> {
    detect_schema_in(REGISTRY, headers)
}

/// Detect the schema of a header row against an explicit registry.
///
/// Requires the same number of columns and the same normalized names in any
/// order. Zero or several matching definitions are both errors.
pub fn detect_schema_in<'r, S: AsRef<str>>(
    registry: &'r [SchemaDefinition],
    headers: &[S],
) -> Result<&'r SchemaDefinition, ReconError> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();
    let mismatch = |matches: Vec<String>| ReconError::SchemaMismatch {
        headers: normalized.clone(),
        matches,
    };

    if normalized.is_empty() || normalized.iter().all(|h| h.is_empty()) {
        return Err(ReconError::SchemaMismatch {
            headers: Vec::new(),
            matches: Vec::new(),
        });
    }

    let header_set: BTreeSet<&str> = normalized.iter().map(String::as_str).collect();
    // A repeated header collapses in the set, so cardinality is checked on the raw list too.
    let candidates: Vec<&'r SchemaDefinition> = registry
        .iter()
        .filter(|schema| {
            normalized.len() == schema.column_count() && header_set == schema.header_set()
        })
        .collect();

    match candidates.as_slice() {
        [schema] => Ok(*schema),
        [] => Err(mismatch(Vec::new())),
        many => Err(mismatch(many.iter().map(|s| s.name.to_string()).collect())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn detects_v1_with_case_and_whitespace_noise() {
        let headers = [" SKU ", "Name", "QUANTITY", "location", " last_counted "];
        assert_eq!(detect_schema(&headers).unwrap().name, "snapshot_v1");
    }

    #[test]
    fn detects_v2_in_any_order() {
        let headers = ["updated_at", "qty", "warehouse", "product_name", "sku"];
        assert_eq!(detect_schema(&headers).unwrap().name, "snapshot_v2");
    }

    #[test]
    fn rejects_empty_header_row() {
        let headers: [&str; 0] = [];
        let err = detect_schema(&headers).unwrap_err();
        assert!(err.to_string().contains("no header row"));
    }

    #[test]
    fn rejects_unknown_field_set() {
        let err = detect_schema(&["sku", "name", "qty", "location", "when_counted"]).unwrap_err();
        match err {
            ReconError::SchemaMismatch { matches, .. } => assert!(matches.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_subset_and_superset() {
        assert!(detect_schema(&["sku", "name", "quantity", "location"]).is_err());
        assert!(detect_schema(&["sku", "name", "quantity", "location", "last_counted", "notes"]).is_err());
    }

    #[test]
    fn rejects_repeated_header_with_same_set() {
        let headers = ["sku", "sku", "name", "quantity", "location", "last_counted"];
        assert!(detect_schema(&headers).is_err());
    }

    #[test]
    fn ambiguous_registry_is_an_error() {
        const CLONE: SchemaDefinition = SchemaDefinition {
            name: "snapshot_v1_clone",
            columns: SNAPSHOT_V1.columns,
        };
        let registry = [SNAPSHOT_V1, CLONE];
        let err = detect_schema_in(&registry, &["sku", "name", "quantity", "location", "last_counted"])
            .unwrap_err();
        match err {
            ReconError::SchemaMismatch { matches, .. } => {
                assert_eq!(matches, vec!["snapshot_v1", "snapshot_v1_clone"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn field_lookup_uses_normalized_names() {
        assert_eq!(SNAPSHOT_V2.field_for("qty"), Some(CanonicalField::Quantity));
        assert_eq!(SNAPSHOT_V2.field_for("quantity"), None);
    }

    fn noisy(header: &'static str) -> impl Strategy<Value = String> {
        (any::<bool>(), 0usize..3, 0usize..3).prop_map(move |(upper, lead, trail)| {
            let body = if upper { header.to_uppercase() } else { header.to_string() };
            format!("{}{}{}", " ".repeat(lead), body, "\t".repeat(trail))
        })
    }

    proptest! {
        #[test]
        fn detection_ignores_case_and_surrounding_whitespace(
            a in noisy("sku"),
            b in noisy("product_name"),
            c in noisy("qty"),
            d in noisy("warehouse"),
            e in noisy("updated_at"),
        ) {
            let headers = [a, b, c, d, e];
            prop_assert_eq!(detect_schema(&headers).unwrap().name, "snapshot_v2");
        }

        #[test]
        fn unknown_headers_always_mismatch(extra in "[a-z]{3,8}") {
            let headers = ["sku", "name", "quantity", "location", extra.as_str()];
            let is_mismatch = matches!(detect_schema(&headers), Err(ReconError::SchemaMismatch { .. }));
            prop_assert!(is_mismatch);
        }
    }
}
