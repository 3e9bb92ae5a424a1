use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, info, warn};

use crate::error::ReconError;
use crate::model::{CanonicalField, CanonicalRow, CombinedParseResult, DataIssue, IssueCode, ParseResult};
use crate::normalize::{normalize_sku, normalize_text, parse_date, parse_quantity};
use crate::schema::{detect_schema, normalize_header, SchemaDefinition};

/// Parse one snapshot file from disk.
pub fn parse_snapshot(path: impl AsRef<Path>) -> Result<ParseResult, ReconError> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    parse_snapshot_reader(&path.display().to_string(), file)
}

/// Parse both snapshot files. The two parses are independent; either failing
/// fails the call.
pub fn parse_both_snapshots(
    snapshot_1: impl AsRef<Path>,
    snapshot_2: impl AsRef<Path>,
) -> Result<CombinedParseResult, ReconError> {
    Ok(CombinedParseResult {
        snapshot_1: parse_snapshot(snapshot_1)?,
        snapshot_2: parse_snapshot(snapshot_2)?,
    })
}

/// Parse snapshot CSV text already held in memory.
pub fn parse_snapshot_str(source: &str, csv_data: &str) -> Result<ParseResult, ReconError> {
    parse_snapshot_reader(source, csv_data.as_bytes())
}

/// Parse a snapshot from any byte stream. `source` identifies the file in
/// provenance fields and messages.
pub fn parse_snapshot_reader<R: Read>(source: &str, input: R) -> Result<ParseResult, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let schema = detect_schema(&headers)?;

    // Every header maps: detection guarantees an exact set match.
    let column_fields: Vec<CanonicalField> = headers
        .iter()
        .filter_map(|h| schema.field_for(&normalize_header(h)))
        .collect();

    let mut rows = Vec::new();
    let mut file_issues = Vec::new();
    let mut blank_rows = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row_number = record
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 2);

        if record.len() > column_fields.len() {
            warn!(
                "{source}: row {row_number} has {} columns, expected {}",
                record.len(),
                column_fields.len()
            );
            file_issues.push(DataIssue::for_file_row(
                IssueCode::RowHasExtraColumns,
                row_number,
                format!("Row {row_number} has more columns than the header"),
            ));
        }

        // Only the declared columns decide blankness; extra cells were flagged above.
        if record.iter().take(column_fields.len()).all(|cell| cell.trim().is_empty()) {
            debug!("{source}: row {row_number} is blank, skipped");
            blank_rows.push(row_number);
            continue;
        }

        let raw: BTreeMap<CanonicalField, String> = column_fields
            .iter()
            .enumerate()
            .filter_map(|(i, field)| record.get(i).map(|v| (*field, v.to_string())))
            .collect();

        rows.push(to_canonical_row(source, row_number, schema, raw));
    }

    let result = ParseResult {
        source: source.to_string(),
        schema_name: schema.name.to_string(),
        rows,
        file_issues,
        blank_rows,
    };

    info!(
        "{source}: schema {}, {} rows ({} with issues), {} blank rows skipped",
        result.schema_name,
        result.total_rows(),
        result.rows_with_issues(),
        result.blank_rows.len()
    );

    Ok(result)
}

fn to_canonical_row(
    source: &str,
    row_number: u64,
    schema: &SchemaDefinition,
    raw: BTreeMap<CanonicalField, String>,
) -> CanonicalRow {
    let cell = |field: CanonicalField| raw.get(&field).map(String::as_str).unwrap_or("");

    let (sku, sku_issues) = normalize_sku(cell(CanonicalField::Sku));
    let (name, name_issues) = normalize_text(cell(CanonicalField::Name), CanonicalField::Name);
    let (quantity, quantity_issues) = parse_quantity(cell(CanonicalField::Quantity));
    let (location, location_issues) =
        normalize_text(cell(CanonicalField::Location), CanonicalField::Location);
    let (counted_on, date_issues) = parse_date(cell(CanonicalField::CountedOn));

    let issues = [sku_issues, name_issues, quantity_issues, location_issues, date_issues].concat();

    CanonicalRow {
        source_file: source.to_string(),
        source_row: row_number,
        source_schema: schema.name.to_string(),
        sku,
        name,
        quantity,
        location,
        counted_on,
        raw,
        issues,
    }
}
