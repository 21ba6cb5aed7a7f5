//! Columns to keep after event reduction, with NanoAOD-version dependent
//! entries resolved once when the configuration is set up.

use serde::{Deserialize, Serialize};

use crate::campaign::NanoVersion;

/// Column that only exists in some NanoAOD versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionedColumn {
    /// Kept for NanoAOD v9 only.
    IfNanoV9(String),
    /// Kept for NanoAOD v10 and newer.
    IfNanoV11(String),
}

/// One entry of a keep-columns list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRule {
    /// Always kept.
    Always(String),
    /// Kept depending on the NanoAOD version.
    Versioned(VersionedColumn),
}

impl ColumnRule {
    /// Column name if the rule applies to `version`.
    pub fn resolve(&self, version: NanoVersion) -> Option<&str> {
        match (self, version) {
            (ColumnRule::Always(c), _) => Some(c.as_str()),
            (ColumnRule::Versioned(VersionedColumn::IfNanoV9(c)), NanoVersion::V9) => {
                Some(c.as_str())
            }
            (ColumnRule::Versioned(VersionedColumn::IfNanoV11(c)), NanoVersion::V11Plus) => {
                Some(c.as_str())
            }
            _ => None,
        }
    }
}

/// Column names applying to `version`, in rule order, without duplicates.
pub fn resolve_columns(rules: &[ColumnRule], version: NanoVersion) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(rules.len());
    for col in rules.iter().filter_map(|r| r.resolve(version)) {
        if !out.iter().any(|c| c == col) {
            out.push(col.to_string());
        }
    }
    out
}
