//! Field-level canonicalization.
//!
//! Every normalizer is a pure function of one raw cell and returns the
//! canonical value together with the data-quality issues it found. None of
//! them fail: bad input yields an issue and an empty or absent value.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::{CanonicalField, DataIssue, IssueCode};

const ISO_DATE: &str = "%Y-%m-%d";
const US_DATE: &str = "%m/%d/%Y";

fn sku_variant_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^SKU-?(\d+)$").unwrap())
}

fn decimal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([+-]?)(\d*)\.(\d*)$").unwrap())
}

/// Trim surrounding whitespace. Empty results are flagged `missing_value`.
pub fn normalize_text(raw: &str, field: CanonicalField) -> (String, Vec<DataIssue>) {
    let trimmed = raw.trim();
    let mut issues = Vec::new();

    if trimmed.is_empty() {
        issues.push(DataIssue::for_field(
            IssueCode::MissingValue,
            field,
            format!("{field} is empty"),
        ));
        return (String::new(), issues);
    }

    if trimmed != raw {
        issues.push(DataIssue::for_field(
            IssueCode::WhitespaceTrimmed,
            field,
            format!("{field} had leading/trailing whitespace"),
        ));
    }

    (trimmed.to_string(), issues)
}

/// Canonicalize a SKU to `SKU-` plus a zero-padded three-digit number.
///
/// Case, inner whitespace, a missing hyphen and wrong zero-padding are all
/// repaired (`sku_format_normalized`). Anything else keeps the trimmed value
/// and is flagged `invalid_sku_format`.
pub fn normalize_sku(raw: &str) -> (String, Vec<DataIssue>) {
    let (cleaned, mut issues) = normalize_text(raw, CanonicalField::Sku);
    if cleaned.is_empty() {
        return (cleaned, issues);
    }

    let candidate: String = cleaned
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    let number = sku_variant_re()
        .captures(&candidate)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|n| *n <= 999);

    match number {
        Some(n) => {
            let canonical = format!("SKU-{n:03}");
            if canonical != cleaned {
                issues.push(DataIssue::for_field(
                    IssueCode::SkuFormatNormalized,
                    CanonicalField::Sku,
                    format!("SKU {cleaned} was normalized to {canonical}"),
                ));
            }
            (canonical, issues)
        }
        None => {
            issues.push(DataIssue::for_field(
                IssueCode::InvalidSkuFormat,
                CanonicalField::Sku,
                format!("SKU has unexpected format: {cleaned}"),
            ));
            (cleaned, issues)
        }
    }
}

/// Parse a quantity cell.
///
/// Integral decimals (`70.0`) are coerced and flagged. Non-integral or
/// unparseable values yield `None`. Negative values are kept but flagged.
pub fn parse_quantity(raw: &str) -> (Option<i64>, Vec<DataIssue>) {
    let (cleaned, mut issues) = normalize_text(raw, CanonicalField::Quantity);
    if cleaned.is_empty() {
        return (None, issues);
    }

    let quantity = match cleaned.parse::<i64>() {
        Ok(q) => q,
        Err(_) => match integral_decimal(&cleaned) {
            DecimalLiteral::Integral(q) => {
                issues.push(DataIssue::for_field(
                    IssueCode::DecimalQuantityFormat,
                    CanonicalField::Quantity,
                    format!("Quantity uses decimal formatting: {cleaned}"),
                ));
                q
            }
            DecimalLiteral::Fractional => {
                issues.push(DataIssue::for_field(
                    IssueCode::NonIntegralQuantity,
                    CanonicalField::Quantity,
                    format!("Quantity is not an integer: {cleaned}"),
                ));
                return (None, issues);
            }
            DecimalLiteral::NotANumber => {
                issues.push(DataIssue::for_field(
                    IssueCode::InvalidQuantity,
                    CanonicalField::Quantity,
                    format!("Quantity is not numeric: {cleaned}"),
                ));
                return (None, issues);
            }
        },
    };

    if quantity < 0 {
        issues.push(DataIssue::for_field(
            IssueCode::NegativeQuantity,
            CanonicalField::Quantity,
            format!("Quantity is negative: {quantity}"),
        ));
    }

    (Some(quantity), issues)
}

enum DecimalLiteral {
    Integral(i64),
    Fractional,
    NotANumber,
}

fn integral_decimal(text: &str) -> DecimalLiteral {
    let Some(caps) = decimal_re().captures(text) else {
        return DecimalLiteral::NotANumber;
    };
    let (sign, whole, frac) = (&caps[1], &caps[2], &caps[3]);
    if whole.is_empty() && frac.is_empty() {
        return DecimalLiteral::NotANumber;
    }
    if frac.bytes().any(|b| b != b'0') {
        return DecimalLiteral::Fractional;
    }
    let whole = if whole.is_empty() { "0" } else { whole };
    // Out-of-range integers cannot take part in arithmetic either.
    match format!("{sign}{whole}").parse::<i64>() {
        Ok(q) => DecimalLiteral::Integral(q),
        Err(_) => DecimalLiteral::NotANumber,
    }
}

/// Parse a count date. ISO `YYYY-MM-DD` is silent, `MM/DD/YYYY` is accepted
/// but flagged, anything else is `invalid_date` with no date.
pub fn parse_date(raw: &str) -> (Option<NaiveDate>, Vec<DataIssue>) {
    let (cleaned, mut issues) = normalize_text(raw, CanonicalField::CountedOn);
    if cleaned.is_empty() {
        return (None, issues);
    }

    if let Ok(date) = NaiveDate::parse_from_str(&cleaned, ISO_DATE) {
        return (Some(date), issues);
    }

    if let Ok(date) = NaiveDate::parse_from_str(&cleaned, US_DATE) {
        issues.push(DataIssue::for_field(
            IssueCode::NonIsoDateFormat,
            CanonicalField::CountedOn,
            format!("Date is not ISO-8601 format: {cleaned}"),
        ));
        return (Some(date), issues);
    }

    issues.push(DataIssue::for_field(
        IssueCode::InvalidDate,
        CanonicalField::CountedOn,
        format!("Unable to parse date: {cleaned}"),
    ));
    (None, issues)
}
