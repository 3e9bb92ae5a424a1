//! `shelfcheck run | inspect | validate`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use shelfcheck_recon::config::ReconConfig;
use shelfcheck_recon::model::{DataIssue, ParseResult};
use shelfcheck_recon::{build_report, parse_both_snapshots, parse_snapshot, KeyStrategy};

use crate::exit_codes::{EXIT_DIFFERENCES, EXIT_ERROR};
use crate::CliError;

pub struct RunArgs {
    pub snapshot_1: Option<PathBuf>,
    pub snapshot_2: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub key_strategy: Option<String>,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub strict: bool,
}

/// Where the snapshots come from and how to key them, after merging
/// command-line flags over an optional config file.
#[derive(Debug)]
struct RunPlan {
    snapshot_1: PathBuf,
    snapshot_2: PathBuf,
    strategy: KeyStrategy,
    output: Option<PathBuf>,
}

fn plan_run(args: &RunArgs) -> Result<RunPlan, CliError> {
    let (snapshot_1, snapshot_2, config_strategy, config_output) = match &args.config {
        Some(config_path) => {
            let config = ReconConfig::from_file(config_path)?;
            let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
            let paths = config.resolve_paths(base_dir);
            tracing::debug!(
                name = %config.name,
                snapshot_1 = %paths.snapshot_1.display(),
                snapshot_2 = %paths.snapshot_2.display(),
                "loaded run config"
            );
            (paths.snapshot_1, paths.snapshot_2, Some(config.key_strategy()), paths.output_json)
        }
        None => match (&args.snapshot_1, &args.snapshot_2) {
            (Some(one), Some(two)) => (one.clone(), two.clone(), None, None),
            _ => {
                return Err(CliError::args("no snapshots given")
                    .with_hint("pass --snapshot-1 and --snapshot-2, or --config <toml>"))
            }
        },
    };

    let strategy = match (&args.key_strategy, config_strategy) {
        (Some(name), _) => KeyStrategy::named(name)?,
        (None, Some(strategy)) => strategy,
        (None, None) => KeyStrategy::default(),
    };

    Ok(RunPlan {
        snapshot_1,
        snapshot_2,
        strategy,
        output: args.output.clone().or(config_output),
    })
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let plan = plan_run(&args)?;

    let combined = parse_both_snapshots(&plan.snapshot_1, &plan.snapshot_2)?;
    let report = build_report(&combined, &plan.strategy);

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = plan.output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CliError::io(format!("cannot create {}: {e}", parent.display())))?;
        }
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &report.summary;
    let dq = &report.data_quality_issues;
    eprintln!(
        "reconciled by {}: {} keys, {} unchanged, {} changed, {} only in snapshot 1, {} only in snapshot 2",
        plan.strategy.name(),
        report.reconciliation.total_keys(),
        s.in_both_unchanged_count,
        s.in_both_changed_count,
        s.only_in_snapshot_1_count,
        s.only_in_snapshot_2_count,
    );
    eprintln!(
        "data quality: {} row issue(s), {} file issue(s), {} merged duplicate key(s)",
        dq.row_issues.len(),
        dq.file_issues.len(),
        dq.duplicate_keys_merged_by_addition.snapshot_1.len()
            + dq.duplicate_keys_merged_by_addition.snapshot_2.len(),
    );

    if args.strict && report.reconciliation.has_differences() {
        return Err(CliError::new(EXIT_DIFFERENCES, "snapshots differ (--strict)"));
    }

    Ok(())
}

// ============================================================================
// inspect
// ============================================================================

#[derive(Debug, Serialize)]
struct InspectOutput<'a> {
    source: &'a str,
    schema: &'a str,
    row_count: usize,
    rows_with_issues: usize,
    blank_rows: &'a [u64],
    issue_counts: BTreeMap<&'static str, usize>,
    file_issues: &'a [DataIssue],
}

fn issue_counts(result: &ParseResult) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    let row_issues = result.rows.iter().flat_map(|r| r.issues.iter());
    for issue in row_issues.chain(result.file_issues.iter()) {
        *counts.entry(issue.code.as_str()).or_insert(0) += 1;
    }
    counts
}

pub fn cmd_inspect(file: PathBuf, json: bool) -> Result<(), CliError> {
    let result = parse_snapshot(&file)?;

    let out = InspectOutput {
        source: &result.source,
        schema: &result.schema_name,
        row_count: result.total_rows(),
        rows_with_issues: result.rows_with_issues(),
        blank_rows: &result.blank_rows,
        issue_counts: issue_counts(&result),
        file_issues: &result.file_issues,
    };

    if json {
        let json_str = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    println!("source:  {}", out.source);
    println!("schema:  {}", out.schema);
    println!("rows:    {} ({} with issues)", out.row_count, out.rows_with_issues);
    if !out.blank_rows.is_empty() {
        let rows: Vec<String> = out.blank_rows.iter().map(u64::to_string).collect();
        println!("blank:   {}", rows.join(", "));
    }
    if out.issue_counts.is_empty() {
        println!("issues:  none");
    } else {
        println!("issues:");
        for (code, count) in &out.issue_counts {
            println!("  {code:<26} {count}");
        }
    }
    for issue in out.file_issues {
        println!("file:    {}", issue.message);
    }

    Ok(())
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = ReconConfig::from_file(&config_path)?;
    eprintln!(
        "valid: '{}' compares {} with {} by {}",
        config.name,
        config.snapshot_1.display(),
        config.snapshot_2.display(),
        config.key_strategy,
    );
    Ok(())
}
