//! `shelfcheck-recon` - inventory snapshot normalization and reconciliation.
//!
//! Pure engine crate: CSV text in, canonical rows, data-quality issues and a
//! keyed two-way diff out. No CLI dependencies; file access is limited to the
//! thin path helpers in [`parser`] and [`config`].

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod report;
pub mod schema;

pub use aggregate::merge_duplicates;
pub use config::ReconConfig;
pub use engine::{
    detect_merged_duplicates, reconcile_combined_result, reconcile_merged, reconcile_rows,
};
pub use error::ReconError;
pub use key::{KeyPreset, KeyStrategy};
pub use model::{
    CanonicalField, CanonicalRow, ChangedItem, CombinedParseResult, DataIssue, DuplicateMergeInfo,
    IssueCode, KeyedQuantity, ParseResult, ReconKey, ReconciliationSummary,
};
pub use parser::{parse_both_snapshots, parse_snapshot, parse_snapshot_reader, parse_snapshot_str};
pub use report::{build_report, ReconReport};
pub use schema::{detect_schema, SchemaDefinition};
