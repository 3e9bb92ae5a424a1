// shelfcheck - inventory snapshot reconciliation from the command line

mod commands;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shelfcheck_recon::ReconError;

use exit_codes::{recon_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "shelfcheck")]
#[command(about = "Normalize and reconcile two inventory CSV snapshots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile two snapshots and report the differences
    #[command(after_help = "\
Examples:
  shelfcheck run --snapshot-1 week1.csv --snapshot-2 week2.csv
  shelfcheck run --snapshot-1 week1.csv --snapshot-2 week2.csv --key-strategy name
  shelfcheck run --config recon.toml --json
  shelfcheck run --config recon.toml --output report.json --strict")]
    Run {
        /// Earlier snapshot CSV
        #[arg(long = "snapshot-1", value_name = "CSV", requires = "snapshot_2", conflicts_with = "config")]
        snapshot_1: Option<PathBuf>,

        /// Later snapshot CSV
        #[arg(long = "snapshot-2", value_name = "CSV", requires = "snapshot_1", conflicts_with = "config")]
        snapshot_2: Option<PathBuf>,

        /// TOML run config (snapshot paths resolve relative to it)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// sku_warehouse, name_warehouse, sku or name (overrides the config)
        #[arg(long, short = 'k', env = "SHELFCHECK_KEY_STRATEGY")]
        key_strategy: Option<String>,

        /// Write the JSON report to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Exit 1 when any key changed, appeared or disappeared
        #[arg(long)]
        strict: bool,
    },

    /// Parse one snapshot and summarize its schema and data-quality issues
    #[command(after_help = "\
Examples:
  shelfcheck inspect week1.csv
  shelfcheck inspect week2.csv --json")]
    Inspect {
        /// Snapshot CSV
        file: PathBuf,

        /// Output JSON instead of a human summary
        #[arg(long)]
        json: bool,
    },

    /// Validate a run config without reading the snapshots
    #[command(after_help = "\
Examples:
  shelfcheck validate recon.toml")]
    Validate {
        /// Path to the TOML config
        config: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Run { snapshot_1, snapshot_2, config, key_strategy, output, json, strict } => {
            commands::cmd_run(commands::RunArgs {
                snapshot_1,
                snapshot_2,
                config,
                key_strategy,
                output,
                json,
                strict,
            })
        }
        Commands::Inspect { file, json } => commands::cmd_inspect(file, json),
        Commands::Validate { config } => commands::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::SchemaMismatch { .. } => Some(
                "expected sku,name,quantity,location,last_counted or \
                 sku,product_name,qty,warehouse,updated_at"
                    .to_string(),
            ),
            ReconError::UnknownKeyStrategy(_) => {
                Some("valid strategies: sku_warehouse, name_warehouse, sku, name".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}
