//! Serializable report assembled from a combined parse and its reconciliation.
//!
//! Pure data: writing it anywhere is the caller's business.

use serde::Serialize;

use crate::aggregate::merge_duplicates;
use crate::engine::reconcile_merged;
use crate::key::KeyStrategy;
use crate::model::{
    CanonicalRow, CombinedParseResult, DataIssue, DuplicateMergeInfo, ParseResult,
    ReconciliationSummary,
};

pub const MERGE_RULE: &str = "If multiple rows resolve to the same reconciliation key within a snapshot, \
their quantities are merged by deterministic addition. Rows without a usable quantity add 0.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotLabel {
    #[serde(rename = "snapshot_1")]
    Snapshot1,
    #[serde(rename = "snapshot_2")]
    Snapshot2,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub metadata: ReportMeta,
    pub summary: ReportSummary,
    pub reconciliation: ReconciliationSummary,
    pub data_quality_issues: DataQualitySection,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub generated_at_utc: String,
    pub engine_version: String,
    pub snapshot_1_source: String,
    pub snapshot_1_schema: String,
    pub snapshot_2_source: String,
    pub snapshot_2_schema: String,
    pub key_strategy: String,
    pub deterministic_merge_rule: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub snapshot_1_row_count: usize,
    pub snapshot_2_row_count: usize,
    pub in_both_changed_count: usize,
    pub in_both_unchanged_count: usize,
    pub only_in_snapshot_1_count: usize,
    pub only_in_snapshot_2_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataQualitySection {
    pub file_issues: Vec<FileIssueEntry>,
    pub row_issues: Vec<RowIssueEntry>,
    pub duplicate_keys_merged_by_addition: PerSnapshot<Vec<DuplicateMergeInfo>>,
    pub rows_without_key: PerSnapshot<Vec<u64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerSnapshot<T> {
    pub snapshot_1: T,
    pub snapshot_2: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileIssueEntry {
    pub snapshot: SnapshotLabel,
    #[serde(flatten)]
    pub issue: DataIssue,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowIssueEntry {
    pub snapshot: SnapshotLabel,
    pub source_file: String,
    pub source_row: u64,
    pub key_fields: KeyFields,
    pub issue: DataIssue,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyFields {
    pub sku: String,
    pub name: String,
    pub location: String,
}

impl KeyFields {
    fn of(row: &CanonicalRow) -> Self {
        Self {
            sku: row.sku.clone(),
            name: row.name.clone(),
            location: row.location.clone(),
        }
    }
}

pub fn build_report(combined: &CombinedParseResult, strategy: &KeyStrategy) -> ReconReport {
    let merged_1 = merge_duplicates(&combined.snapshot_1.rows, strategy);
    let merged_2 = merge_duplicates(&combined.snapshot_2.rows, strategy);
    let reconciliation = reconcile_merged(&merged_1, &merged_2, strategy);

    let sides = [
        (SnapshotLabel::Snapshot1, &combined.snapshot_1),
        (SnapshotLabel::Snapshot2, &combined.snapshot_2),
    ];

    let file_issues = sides
        .iter()
        .flat_map(|(label, result)| file_issue_entries(*label, result))
        .collect();
    let row_issues = sides
        .iter()
        .flat_map(|(label, result)| row_issue_entries(*label, result))
        .collect();

    ReconReport {
        metadata: ReportMeta {
            generated_at_utc: chrono::Utc::now().to_rfc3339(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            snapshot_1_source: combined.snapshot_1.source.clone(),
            snapshot_1_schema: combined.snapshot_1.schema_name.clone(),
            snapshot_2_source: combined.snapshot_2.source.clone(),
            snapshot_2_schema: combined.snapshot_2.schema_name.clone(),
            key_strategy: strategy.name().to_string(),
            deterministic_merge_rule: MERGE_RULE,
        },
        summary: ReportSummary {
            snapshot_1_row_count: combined.snapshot_1.total_rows(),
            snapshot_2_row_count: combined.snapshot_2.total_rows(),
            in_both_changed_count: reconciliation.in_both_changed.len(),
            in_both_unchanged_count: reconciliation.in_both_unchanged.len(),
            only_in_snapshot_1_count: reconciliation.only_in_snapshot_1.len(),
            only_in_snapshot_2_count: reconciliation.only_in_snapshot_2.len(),
        },
        reconciliation,
        data_quality_issues: DataQualitySection {
            file_issues,
            row_issues,
            duplicate_keys_merged_by_addition: PerSnapshot {
                snapshot_1: merged_1.duplicates,
                snapshot_2: merged_2.duplicates,
            },
            rows_without_key: PerSnapshot {
                snapshot_1: merged_1.unkeyed_rows,
                snapshot_2: merged_2.unkeyed_rows,
            },
        },
    }
}

fn file_issue_entries(label: SnapshotLabel, result: &ParseResult) -> Vec<FileIssueEntry> {
    result
        .file_issues
        .iter()
        .map(|issue| FileIssueEntry {
            snapshot: label,
            issue: issue.clone(),
        })
        .collect()
}

fn row_issue_entries(label: SnapshotLabel, result: &ParseResult) -> Vec<RowIssueEntry> {
    result
        .rows
        .iter()
        .flat_map(|row| {
            row.issues.iter().map(move |issue| RowIssueEntry {
                snapshot: label,
                source_file: row.source_file.clone(),
                source_row: row.source_row,
                key_fields: KeyFields::of(row),
                issue: issue.clone(),
            })
        })
        .collect()
}
