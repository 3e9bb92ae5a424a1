use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Canonical fields
// ---------------------------------------------------------------------------

/// The five fields every snapshot layout maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Sku,
    Name,
    Quantity,
    Location,
    CountedOn,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 5] = [
        Self::Sku,
        Self::Name,
        Self::Quantity,
        Self::Location,
        Self::CountedOn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sku => "sku",
            Self::Name => "name",
            Self::Quantity => "quantity",
            Self::Location => "location",
            Self::CountedOn => "counted_on",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Data-quality issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    WhitespaceTrimmed,
    MissingValue,
    SkuFormatNormalized,
    InvalidSkuFormat,
    DecimalQuantityFormat,
    NonIntegralQuantity,
    InvalidQuantity,
    NegativeQuantity,
    NonIsoDateFormat,
    InvalidDate,
    RowHasExtraColumns,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhitespaceTrimmed => "whitespace_trimmed",
            Self::MissingValue => "missing_value",
            Self::SkuFormatNormalized => "sku_format_normalized",
            Self::InvalidSkuFormat => "invalid_sku_format",
            Self::DecimalQuantityFormat => "decimal_quantity_format",
            Self::NonIntegralQuantity => "non_integral_quantity",
            Self::InvalidQuantity => "invalid_quantity",
            Self::NegativeQuantity => "negative_quantity",
            Self::NonIsoDateFormat => "non_iso_date_format",
            Self::InvalidDate => "invalid_date",
            Self::RowHasExtraColumns => "row_has_extra_columns",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal defect found while normalizing one row or one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataIssue {
    pub code: IssueCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<CanonicalField>,
    /// Source row for file-level issues. Row-level issues leave this empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<u64>,
}

impl DataIssue {
    pub fn for_field(code: IssueCode, field: CanonicalField, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: Some(field),
            row: None,
        }
    }

    pub fn for_file_row(code: IssueCode, row: u64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            row: Some(row),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsed rows
// ---------------------------------------------------------------------------

/// One inventory record after normalization, independent of its source layout.
///
/// `quantity` is `None` when the raw value could not be read as an integer
/// (non-integral, unparseable or empty). Such rows stay in the output with the
/// matching issue attached and count as zero in merge and delta arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRow {
    pub source_file: String,
    /// Physical line in the source file (header is line 1).
    pub source_row: u64,
    pub source_schema: String,
    pub sku: String,
    pub name: String,
    pub quantity: Option<i64>,
    pub location: String,
    pub counted_on: Option<NaiveDate>,
    /// Unmodified cell text for every column the row actually carried.
    pub raw: BTreeMap<CanonicalField, String>,
    pub issues: Vec<DataIssue>,
}

impl CanonicalRow {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn quantity_or_zero(&self) -> i64 {
        self.quantity.unwrap_or(0)
    }

    pub fn has_issue(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

/// Parsed output for one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    pub source: String,
    pub schema_name: String,
    pub rows: Vec<CanonicalRow>,
    pub file_issues: Vec<DataIssue>,
    /// Source rows dropped because every cell was empty. Not an issue.
    pub blank_rows: Vec<u64>,
}

impl ParseResult {
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn rows_with_issues(&self) -> usize {
        self.rows.iter().filter(|r| r.has_issues()).count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CombinedParseResult {
    pub snapshot_1: ParseResult,
    pub snapshot_2: ParseResult,
}

impl CombinedParseResult {
    /// Rows of snapshot 1 followed by rows of snapshot 2.
    pub fn all_rows(&self) -> impl Iterator<Item = &CanonicalRow> + '_ {
        self.snapshot_1.rows.iter().chain(self.snapshot_2.rows.iter())
    }
}

// ---------------------------------------------------------------------------
// Reconciliation keys
// ---------------------------------------------------------------------------

/// Identity of one inventory entry under a key strategy.
///
/// Components are kept apart, so equality never depends on separator text.
/// `Display` (and serialization) joins them with `|`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReconKey(Vec<String>);

impl ReconKey {
    pub const SEPARATOR: char = '|';

    pub fn single(value: impl Into<String>) -> Self {
        Self(vec![value.into()])
    }

    pub fn composite<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ReconKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", Self::SEPARATOR)?;
            }
            f.write_str(part)?;
        }
        Ok(())
    }
}

impl Serialize for ReconKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Duplicate merge
// ---------------------------------------------------------------------------

/// All rows of one snapshot that share a key, collapsed into one entry.
#[derive(Debug, Clone, Serialize)]
pub struct MergedEntry {
    pub key: ReconKey,
    /// First contributing row in input order; supplies the non-quantity fields.
    pub representative: CanonicalRow,
    pub quantity: i64,
    pub row_count: usize,
    pub source_rows: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMergeInfo {
    pub key: ReconKey,
    pub row_count: usize,
    pub merged_quantity: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MergedSnapshot {
    pub entries: BTreeMap<ReconKey, MergedEntry>,
    /// One entry per key with more than one contributing row, sorted by key.
    pub duplicates: Vec<DuplicateMergeInfo>,
    /// Source rows for which the key strategy produced no key.
    pub unkeyed_rows: Vec<u64>,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedItem {
    pub key: ReconKey,
    pub snapshot_1_quantity: i64,
    pub snapshot_2_quantity: i64,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyedQuantity {
    pub key: ReconKey,
    pub quantity: i64,
}

/// Two-way diff of merged snapshots. Every list is sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub in_both_unchanged: Vec<ReconKey>,
    pub in_both_changed: Vec<ChangedItem>,
    pub only_in_snapshot_1: Vec<KeyedQuantity>,
    pub only_in_snapshot_2: Vec<KeyedQuantity>,
    /// `quantity_2 - quantity_1` for every key on either side; absent side is 0.
    pub delta_by_key: BTreeMap<ReconKey, i64>,
}

impl ReconciliationSummary {
    pub fn total_keys(&self) -> usize {
        self.delta_by_key.len()
    }

    pub fn has_differences(&self) -> bool {
        !self.in_both_changed.is_empty()
            || !self.only_in_snapshot_1.is_empty()
            || !self.only_in_snapshot_2.is_empty()
    }
}
