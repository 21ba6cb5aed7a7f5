//! Per-campaign analysis configuration.

use std::path::PathBuf;

use httcp_columnar::HadronicRule;
use httcp_core::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::campaign::Campaign;
use crate::columns::{ColumnRule, resolve_columns};
use crate::cuts::ChannelSelection;
use crate::triggers::{Trigger, TriggerLeg};
use crate::working_points::{BtagWorkingPoints, DeepTau};

/// Version used for task families that read their version from the command
/// line when none is given.
pub const DEFAULT_TASK_VERSION: &str = "dev1";

/// A physics process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// Process name, e.g. `h_ggf_htt`.
    pub name: String,
    /// Simulated (`true`) or recorded data.
    #[serde(default = "default_true")]
    pub is_mc: bool,
    /// Plot color (RGB).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
}

fn default_true() -> bool {
    true
}

/// A dataset of one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset name.
    pub name: String,
    /// Name of the process the dataset belongs to.
    pub process: String,
    /// Recorded data rather than simulation.
    #[serde(default)]
    pub is_data: bool,
    /// Dataset key (path fragment) used to locate the files.
    #[serde(default)]
    pub key: String,
    /// Number of files to process; `None` means all files found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_files: Option<u32>,
}

impl Dataset {
    /// Restrict the dataset to at most `limit` files.
    pub fn limit_files(&mut self, limit: u32) {
        self.n_files = Some(self.n_files.map_or(limit, |n| n.min(limit)));
    }
}

/// Analysis channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel name (`etau`, `mutau`, `tautau`).
    pub name: String,
    /// Channel id stored per event.
    pub id: u32,
}

/// Systematic shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    /// Shift name.
    pub name: String,
    /// Shift id.
    pub id: u32,
}

/// Integrated luminosity with named relative uncertainties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Luminosity {
    /// Integrated luminosity in pb⁻¹.
    pub value: f64,
    /// Source name → relative uncertainty.
    #[serde(default)]
    pub uncertainties: IndexMap<String, f64>,
}

impl Luminosity {
    /// Absolute uncertainty (pb⁻¹) of one source.
    pub fn uncertainty(&self, name: &str) -> Option<f64> {
        self.uncertainties.get(name).map(|rel| rel * self.value)
    }

    /// All sources added in quadrature (pb⁻¹).
    pub fn total_uncertainty(&self) -> f64 {
        self.uncertainties.values().map(|rel| (rel * self.value).powi(2)).sum::<f64>().sqrt()
    }
}

/// Entry of the external files registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalFile {
    /// Plain path.
    Path(PathBuf),
    /// Path with a version tag.
    Versioned(PathBuf, String),
    /// Nested group of files.
    Group(IndexMap<String, ExternalFile>),
}

impl ExternalFile {
    /// Path of a file entry; `None` for groups.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ExternalFile::Path(p) | ExternalFile::Versioned(p, _) => Some(p),
            ExternalFile::Group(_) => None,
        }
    }
}

/// Version assignment of one task family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskVersion {
    /// Fixed version.
    Pinned(String),
    /// Version given on the command line, [`DEFAULT_TASK_VERSION`] otherwise.
    FromCli,
}

/// Default analysis objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    /// Calibrator.
    pub calibrator: String,
    /// Selector.
    pub selector: String,
    /// Producer.
    pub producer: String,
    /// ML model.
    #[serde(default)]
    pub ml_model: Option<String>,
    /// Inference model.
    #[serde(default)]
    pub inference_model: Option<String>,
    /// Categories.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Variables.
    #[serde(default)]
    pub variables: Vec<String>,
    /// Weight producer.
    pub weight_producer: String,
}

/// Generator-level tau settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenTauSettings {
    /// Hadronic decay condition used by the decay-mode classification.
    #[serde(default)]
    pub hadronic_rule: HadronicRule,
}

/// Configuration of the analysis for one campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Config name.
    pub name: String,
    /// Config id.
    pub id: u32,
    /// Campaign.
    pub campaign: Campaign,
    /// Cap on the number of files per dataset (testing setups).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_dataset_files: Option<u32>,
    /// Registered processes.
    pub processes: Vec<Process>,
    /// Registered datasets.
    pub datasets: Vec<Dataset>,
    /// Analysis channels.
    pub channels: Vec<Channel>,
    /// Systematic shifts.
    #[serde(default)]
    pub shifts: Vec<Shift>,
    /// Default analysis objects.
    pub defaults: Defaults,
    /// Process groups.
    #[serde(default)]
    pub process_groups: IndexMap<String, Vec<String>>,
    /// Dataset groups.
    #[serde(default)]
    pub dataset_groups: IndexMap<String, Vec<String>>,
    /// Category groups.
    #[serde(default)]
    pub category_groups: IndexMap<String, Vec<String>>,
    /// Variable groups.
    #[serde(default)]
    pub variable_groups: IndexMap<String, Vec<String>>,
    /// Shift groups.
    #[serde(default)]
    pub shift_groups: IndexMap<String, Vec<String>>,
    /// Selector step groups (cutflow step orderings).
    #[serde(default)]
    pub selector_step_groups: IndexMap<String, Vec<String>>,
    /// Whether the number of discovered LFNs must match the dataset.
    #[serde(default)]
    pub validate_dataset_lfns: bool,
    /// Integrated luminosity.
    pub luminosity: Luminosity,
    /// DeepTau settings.
    pub deep_tau: DeepTau,
    /// b-tagging working points.
    #[serde(default)]
    pub btag_working_points: BtagWorkingPoints,
    /// External files (corrections, luminosity masks, pileup profiles).
    #[serde(default)]
    pub external_files: IndexMap<String, ExternalFile>,
    /// Target file size after merging reduced events (MB).
    #[serde(default)]
    pub reduced_file_size: Option<f64>,
    /// Task family → version.
    #[serde(default)]
    pub versions: IndexMap<String, TaskVersion>,
    /// Task family → columns to keep.
    #[serde(default)]
    pub keep_columns: IndexMap<String, Vec<ColumnRule>>,
    /// Channel name → object selection.
    #[serde(default)]
    pub selection: IndexMap<String, ChannelSelection>,
    /// Generator-level tau settings.
    #[serde(default)]
    pub gen_tau: GenTauSettings,
    /// HLT paths.
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    /// MET filter flags required of every event.
    #[serde(default)]
    pub met_filters: Vec<String>,
}

impl Config {
    /// Apply the file limit and validate the configuration.
    pub fn finalize(&mut self) -> Result<()> {
        if let Some(limit) = self.limit_dataset_files {
            for ds in &mut self.datasets {
                ds.limit_files(limit);
            }
        }
        self.validate()
    }

    /// Check uniqueness of names/ids and that selections refer to known channels.
    pub fn validate(&self) -> Result<()> {
        check_unique(self.processes.iter().map(|p| p.name.as_str()), "process", &self.name)?;
        check_unique(self.datasets.iter().map(|d| d.name.as_str()), "dataset", &self.name)?;
        check_unique(self.channels.iter().map(|c| c.name.as_str()), "channel", &self.name)?;
        let ids: Vec<String> = self.channels.iter().map(|c| c.id.to_string()).collect();
        check_unique(ids.iter().map(|s| s.as_str()), "channel id", &self.name)?;
        check_unique(self.triggers.iter().map(|t| t.name.as_str()), "trigger", &self.name)?;
        let ids: Vec<String> = self.triggers.iter().map(|t| t.id.to_string()).collect();
        check_unique(ids.iter().map(|s| s.as_str()), "trigger id", &self.name)?;
        check_unique(self.met_filters.iter().map(|f| f.as_str()), "MET filter", &self.name)?;

        for trigger in &self.triggers {
            trigger.validate(&self.name)?;
            if let Some(ch) = trigger.channels.iter().find(|c| self.channel(c).is_none()) {
                return Err(Error::Validation(format!(
                    "config '{}': trigger '{}' used in unknown channel '{ch}'",
                    self.name, trigger.name
                )));
            }
        }

        for (channel, sel) in &self.selection {
            if self.channel(channel).is_none() {
                return Err(Error::Validation(format!(
                    "config '{}': selection for unknown channel '{channel}'",
                    self.name
                )));
            }
            sel.validate(channel, &self.deep_tau)?;
        }
        Ok(())
    }

    /// Channel by name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Process by name.
    pub fn process(&self, name: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.name == name)
    }

    /// Dataset by name.
    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Object selection of a channel.
    pub fn selection_for(&self, channel: &str) -> Result<&ChannelSelection> {
        self.selection.get(channel).ok_or_else(|| {
            Error::Validation(format!("config '{}': no selection for channel '{channel}'", self.name))
        })
    }

    /// HLT paths used in a channel.
    pub fn triggers_for<'a>(&'a self, channel: &'a str) -> impl Iterator<Item = &'a Trigger> + 'a {
        self.triggers.iter().filter(move |t| t.applies_to(channel))
    }

    /// Legs of the channel's HLT paths firing on trigger objects with id `pdg_id`.
    pub fn trigger_legs<'a>(&'a self, channel: &'a str, pdg_id: i32) -> Vec<&'a TriggerLeg> {
        self.triggers_for(channel).flat_map(|t| t.legs_for(pdg_id)).collect()
    }

    /// Columns to keep for a task family, resolved for the campaign's NanoAOD version.
    pub fn keep_columns_for(&self, task: &str) -> Vec<String> {
        self.keep_columns
            .get(task)
            .map(|rules| resolve_columns(rules, self.campaign.nano()))
            .unwrap_or_default()
    }

    /// Version of a task family; `None` when the family has no entry.
    pub fn task_version(&self, family: &str, cli_version: Option<&str>) -> Option<String> {
        match self.versions.get(family)? {
            TaskVersion::Pinned(v) => Some(v.clone()),
            TaskVersion::FromCli => {
                Some(cli_version.filter(|v| !v.is_empty()).unwrap_or(DEFAULT_TASK_VERSION).into())
            }
        }
    }

    /// Look up an external file by dotted path, e.g. `lumi.golden`.
    pub fn external_file(&self, dotted: &str) -> Option<&PathBuf> {
        let mut parts = dotted.split('.');
        let mut entry = self.external_files.get(parts.next()?)?;
        for part in parts {
            match entry {
                ExternalFile::Group(g) => entry = g.get(part)?,
                _ => return None,
            }
        }
        entry.path()
    }
}

fn check_unique<'a>(names: impl Iterator<Item = &'a str>, what: &str, config: &str) -> Result<()> {
    let mut seen: Vec<&str> = Vec::new();
    for n in names {
        if seen.contains(&n) {
            return Err(Error::Validation(format!("config '{config}': duplicate {what} '{n}'")));
        }
        seen.push(n);
    }
    Ok(())
}

/// Check that the process of every dataset is registered in the config.
///
/// Returns the names of the datasets whose process is unknown. With `warn`
/// set they are only logged, otherwise the first one is an error.
pub fn verify_config_processes(config: &Config, warn: bool) -> Result<Vec<String>> {
    let unknown: Vec<String> = config
        .datasets
        .iter()
        .filter(|ds| config.process(&ds.process).is_none())
        .map(|ds| ds.name.clone())
        .collect();

    if let Some(first) = unknown.first() {
        if !warn {
            return Err(Error::Validation(format!(
                "config '{}': dataset '{first}' belongs to unregistered process",
                config.name
            )));
        }
        for ds in &unknown {
            tracing::warn!(config = %config.name, dataset = %ds, "dataset process not registered");
        }
    }
    Ok(unknown)
}
