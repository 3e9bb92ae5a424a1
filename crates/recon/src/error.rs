use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// Header row matched no registered schema, or more than one.
    SchemaMismatch {
        headers: Vec<String>,
        /// Names of every schema that matched. Empty when none did.
        matches: Vec<String>,
    },
    /// IO error (file open, read, etc.).
    Io(String),
    /// Structural CSV failure (invalid UTF-8, unreadable record).
    Csv(String),
    /// Named key strategy is not one of the presets.
    UnknownKeyStrategy(String),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (missing name, duplicate snapshot path, etc.).
    ConfigValidation(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaMismatch { headers, .. } if headers.is_empty() => {
                write!(f, "schema mismatch: CSV file has no header row")
            }
            Self::SchemaMismatch { headers, matches } if matches.is_empty() => {
                write!(f, "schema mismatch: unrecognized header fields: {}", headers.join(", "))
            }
            Self::SchemaMismatch { headers, matches } => write!(
                f,
                "schema mismatch: header fields [{}] are ambiguous between schemas {}",
                headers.join(", "),
                matches.join(", ")
            ),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::UnknownKeyStrategy(name) => write!(
                f,
                "unknown key strategy: \"{name}\" (expected sku_warehouse, name_warehouse, sku or name)"
            ),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<csv::Error> for ReconError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            Self::Io(err.to_string())
        } else {
            Self::Csv(err.to_string())
        }
    }
}
