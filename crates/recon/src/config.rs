use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ReconError;
use crate::key::{KeyPreset, KeyStrategy};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A reconciliation run described in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    /// Resolved relative to the config file's directory.
    pub snapshot_1: PathBuf,
    pub snapshot_2: PathBuf,
    #[serde(default)]
    pub key_strategy: KeyPreset,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ReconError> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        for (label, path) in [("snapshot_1", &self.snapshot_1), ("snapshot_2", &self.snapshot_2)] {
            if path.as_os_str().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{label} path must not be empty")));
            }
        }

        if self.snapshot_1 == self.snapshot_2 {
            return Err(ReconError::ConfigValidation(format!(
                "snapshot_1 and snapshot_2 both point at {}",
                self.snapshot_1.display()
            )));
        }

        Ok(())
    }

    pub fn key_strategy(&self) -> KeyStrategy {
        KeyStrategy::preset(self.key_strategy)
    }

    /// Snapshot and output paths joined onto `base_dir` (absolute paths are kept).
    pub fn resolve_paths(&self, base_dir: &Path) -> ResolvedPaths {
        ResolvedPaths {
            snapshot_1: base_dir.join(&self.snapshot_1),
            snapshot_2: base_dir.join(&self.snapshot_2),
            output_json: self.output.json.as_ref().map(|p| base_dir.join(p)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub snapshot_1: PathBuf,
    pub snapshot_2: PathBuf,
    pub output_json: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
