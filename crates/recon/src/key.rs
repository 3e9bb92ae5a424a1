//! Key strategies: which canonical fields identify "the same" inventory entry.
//!
//! A strategy is a plain function value. The four presets are pre-built
//! instances; callers supply their own through [`KeyStrategy::custom`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{CanonicalRow, ReconKey};

/// Maps a row to its key. `None` means the row cannot be keyed (an empty
/// component) and is left out of merging and reconciliation.
pub type KeyFn = dyn Fn(&CanonicalRow) -> Option<ReconKey> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPreset {
    #[default]
    SkuWarehouse,
    NameWarehouse,
    Sku,
    Name,
}

impl KeyPreset {
    pub const ALL: [KeyPreset; 4] = [Self::SkuWarehouse, Self::NameWarehouse, Self::Sku, Self::Name];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkuWarehouse => "sku_warehouse",
            Self::NameWarehouse => "name_warehouse",
            Self::Sku => "sku",
            Self::Name => "name",
        }
    }

    fn key_fn(self) -> fn(&CanonicalRow) -> Option<ReconKey> {
        match self {
            Self::SkuWarehouse => key_by_sku_warehouse,
            Self::NameWarehouse => key_by_name_warehouse,
            Self::Sku => key_by_sku,
            Self::Name => key_by_name,
        }
    }
}

impl fmt::Display for KeyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyPreset {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ReconError::UnknownKeyStrategy(s.to_string()))
    }
}

/// A named key function. Cheap to clone.
#[derive(Clone)]
pub struct KeyStrategy {
    name: String,
    key_fn: Arc<KeyFn>,
}

impl KeyStrategy {
    pub fn preset(preset: KeyPreset) -> Self {
        Self {
            name: preset.as_str().to_string(),
            key_fn: Arc::new(preset.key_fn()),
        }
    }

    /// Resolve a preset by its name. Unknown names are an argument error.
    pub fn named(name: &str) -> Result<Self, ReconError> {
        name.parse::<KeyPreset>().map(Self::preset)
    }

    pub fn custom<F>(name: impl Into<String>, key_fn: F) -> Self
    where
        F: Fn(&CanonicalRow) -> Option<ReconKey> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            key_fn: Arc::new(key_fn),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_for(&self, row: &CanonicalRow) -> Option<ReconKey> {
        (self.key_fn)(row)
    }
}

impl Default for KeyStrategy {
    fn default() -> Self {
        Self::preset(KeyPreset::default())
    }
}

impl From<KeyPreset> for KeyStrategy {
    fn from(preset: KeyPreset) -> Self {
        Self::preset(preset)
    }
}

impl fmt::Debug for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStrategy").field("name", &self.name).finish()
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

pub fn key_by_sku(row: &CanonicalRow) -> Option<ReconKey> {
    non_empty(&row.sku).map(ReconKey::single)
}

/// Trimmed name, compared case-sensitively: `Widget A` and `widget a` are
/// different entries. Use [`KeyStrategy::custom`] to fold case.
pub fn key_by_name(row: &CanonicalRow) -> Option<ReconKey> {
    non_empty(&row.name).map(ReconKey::single)
}

/// SKU plus location, so stock in different warehouses never collapses.
pub fn key_by_sku_warehouse(row: &CanonicalRow) -> Option<ReconKey> {
    let sku = non_empty(&row.sku)?;
    let location = non_empty(&row.location)?;
    Some(ReconKey::composite([sku, location]))
}

/// Name plus location, both case-sensitive like [`key_by_name`].
pub fn key_by_name_warehouse(row: &CanonicalRow) -> Option<ReconKey> {
    let name = non_empty(&row.name)?;
    let location = non_empty(&row.location)?;
    Some(ReconKey::composite([name, location]))
}
