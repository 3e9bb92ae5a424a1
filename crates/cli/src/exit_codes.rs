//! CLI Exit Code Registry
//!
//! Single source of truth for `shelfcheck` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                               |
//! |------|-------------------------------------------------------|
//! | 0    | Success                                               |
//! | 1    | General error, or differences found under `--strict`  |
//! | 2    | CLI usage error (bad or missing arguments)            |
//! | 3    | Snapshot header matches no schema (or several)        |
//! | 4    | I/O error reading a snapshot/config or writing output |
//! | 5    | Invalid config file                                   |
//! | 6    | Unknown key strategy                                  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError::from(ReconError)` or the relevant command

use shelfcheck_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// `run --strict` found changed, added or removed keys.
/// Like `diff(1)`, exit 1 means "snapshots differ."
pub const EXIT_DIFFERENCES: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Header row matched no registered snapshot schema, or more than one.
pub const EXIT_SCHEMA_MISMATCH: u8 = 3;

/// A file could not be read or written.
pub const EXIT_IO: u8 = 4;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 5;

/// `--key-strategy` named something other than the four presets.
pub const EXIT_UNKNOWN_KEY_STRATEGY: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::SchemaMismatch { .. } => EXIT_SCHEMA_MISMATCH,
        ReconError::Io(_) => EXIT_IO,
        ReconError::Csv(_) => EXIT_ERROR,
        ReconError::UnknownKeyStrategy(_) => EXIT_UNKNOWN_KEY_STRATEGY,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
    }
}
