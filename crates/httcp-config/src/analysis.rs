//! Top-level analysis object holding the per-campaign configs.

use std::path::Path;

use httcp_core::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{Config, TaskVersion};

/// The analysis with all its configs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Analysis name.
    pub name: String,
    /// Analysis id.
    pub id: u32,
    /// Analysis-wide task versions (configs take precedence).
    #[serde(default)]
    pub versions: IndexMap<String, TaskVersion>,
    /// Bash sandboxes required by remote tasks.
    #[serde(default)]
    pub bash_sandboxes: Vec<String>,
    /// CMSSW sandboxes required by remote tasks.
    #[serde(default)]
    pub cmssw_sandboxes: Vec<String>,
    /// Config groups.
    #[serde(default)]
    pub config_groups: IndexMap<String, Vec<String>>,
    /// Per-campaign configs.
    pub configs: Vec<Config>,
}

impl Analysis {
    /// Read an analysis from YAML (JSON is accepted as well) and finalize
    /// every config.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut analysis: Analysis = serde_yaml_ng::from_slice(&bytes)?;
        analysis.finalize()?;
        tracing::info!(
            path = %path.display(),
            analysis = %analysis.name,
            configs = analysis.configs.len(),
            "analysis loaded"
        );
        Ok(analysis)
    }

    /// Apply file limits and validate every config.
    pub fn finalize(&mut self) -> Result<()> {
        let names: Vec<&str> = self.configs.iter().map(|c| c.name.as_str()).collect();
        for (i, n) in names.iter().enumerate() {
            if names[..i].contains(n) {
                return Err(Error::Validation(format!("duplicate config '{n}'")));
            }
        }
        for cfg in &mut self.configs {
            cfg.finalize()?;
        }
        Ok(())
    }

    /// Config by name.
    pub fn config(&self, name: &str) -> Result<&Config> {
        self.configs.iter().find(|c| c.name == name).ok_or_else(|| {
            Error::Validation(format!(
                "analysis '{}' has no config '{name}' (available: {})",
                self.name,
                self.configs.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Add a bash sandbox unless it is already registered.
    pub fn add_bash_sandbox(&mut self, sandbox: impl Into<String>) {
        let sandbox = sandbox.into();
        if !self.bash_sandboxes.contains(&sandbox) {
            self.bash_sandboxes.push(sandbox);
        }
    }
}
