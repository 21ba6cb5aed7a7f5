//! Object selection cuts per channel.

use httcp_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::working_points::{DeepTau, DeepTauDiscriminant};

/// Name of the event-level step recording a trigger object match.
pub const TRIGGER_MATCH_STEP: &str = "trigger_match";

/// Name of the event-level step requiring every MET filter flag.
pub const MET_FILTER_STEP: &str = "met_filter";

/// Comparison applied to an object field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    /// `x > value`
    Gt,
    /// `x >= value`
    #[default]
    Ge,
    /// `x < value`
    Lt,
    /// `x <= value`
    Le,
    /// `x == value`
    Eq,
    /// `x != value`
    Ne,
    /// `x` is one of `values`
    OneOf,
}

/// Reconstructed object collection of an event chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Muons.
    Muon,
    /// Electrons.
    Electron,
    /// Hadronically decaying taus.
    Tau,
}

impl Collection {
    /// Trigger object id (`TrigObj.id`) of the collection.
    pub fn pdg_id(self) -> i32 {
        match self {
            Collection::Muon => 13,
            Collection::Electron => 11,
            Collection::Tau => 15,
        }
    }

    /// Lower-case collection name.
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Muon => "muon",
            Collection::Electron => "electron",
            Collection::Tau => "tau",
        }
    }
}

/// One named cut on an object field.
///
/// When `deep_tau` is set, `field`, `op` and `value` are derived from the
/// configured DeepTau tagger and working point instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectCut {
    /// Step name, e.g. `muon_pt_26`.
    pub name: String,
    /// Object field the cut reads (`pt`, `eta`, `dz`, or an auxiliary field).
    #[serde(default)]
    pub field: String,
    /// Comparison.
    #[serde(default)]
    pub op: CmpOp,
    /// Threshold for scalar comparisons.
    #[serde(default)]
    pub value: f64,
    /// Accepted values for [`CmpOp::OneOf`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f64>,
    /// Compare `|x|` instead of `x`.
    #[serde(default)]
    pub abs: bool,
    /// Take the cut from the DeepTau configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_tau: Option<DeepTauDiscriminant>,
}

impl ObjectCut {
    /// Scalar comparison cut.
    pub fn new(name: impl Into<String>, field: impl Into<String>, op: CmpOp, value: f64) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            op,
            value,
            values: Vec::new(),
            abs: false,
            deep_tau: None,
        }
    }

    /// Membership cut.
    pub fn one_of(name: impl Into<String>, field: impl Into<String>, values: &[f64]) -> Self {
        Self { values: values.to_vec(), ..Self::new(name, field, CmpOp::OneOf, 0.0) }
    }

    /// DeepTau working point cut.
    pub fn deep_tau(name: impl Into<String>, disc: DeepTauDiscriminant) -> Self {
        Self { deep_tau: Some(disc), ..Self::new(name, "", CmpOp::Ge, 0.0) }
    }

    /// Compare the absolute value of the field.
    pub fn abs(mut self) -> Self {
        self.abs = true;
        self
    }

    /// Fix field, comparison and threshold against the DeepTau configuration.
    pub fn resolve(&self, deep_tau: &DeepTau) -> Result<ResolvedCut> {
        let (field, op, value) = match self.deep_tau {
            Some(disc) => (deep_tau.column(disc), CmpOp::Ge, f64::from(deep_tau.threshold(disc)?)),
            None => (self.field.clone(), self.op, self.value),
        };
        if field.is_empty() {
            return Err(Error::Validation(format!("cut '{}' has no field", self.name)));
        }
        if op == CmpOp::OneOf && self.values.is_empty() {
            return Err(Error::Validation(format!(
                "cut '{}' uses one_of without values",
                self.name
            )));
        }
        Ok(ResolvedCut {
            name: self.name.clone(),
            field,
            op,
            value,
            values: self.values.clone(),
            abs: self.abs,
        })
    }
}

/// A cut with every setting fixed, ready to be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCut {
    /// Step name.
    pub name: String,
    /// Object field.
    pub field: String,
    /// Comparison.
    pub op: CmpOp,
    /// Threshold.
    pub value: f64,
    /// Accepted values for [`CmpOp::OneOf`].
    pub values: Vec<f64>,
    /// Compare `|x|`.
    pub abs: bool,
}

impl ResolvedCut {
    /// Whether a field value passes. NaN never passes except for `ne`.
    pub fn passes(&self, x: f64) -> bool {
        let x = if self.abs { x.abs() } else { x };
        match self.op {
            CmpOp::Gt => x > self.value,
            CmpOp::Ge => x >= self.value,
            CmpOp::Lt => x < self.value,
            CmpOp::Le => x <= self.value,
            CmpOp::Eq => x == self.value,
            CmpOp::Ne => x != self.value,
            CmpOp::OneOf => self.values.contains(&x),
        }
    }
}

/// Consecutive cuts on one collection; every cut adds to the previous ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutStage {
    /// Suffix appended to the stage's step names when merged.
    pub suffix: String,
    /// Cuts, applied cumulatively in order.
    pub cuts: Vec<ObjectCut>,
}

/// Object selection of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSelection {
    /// Light lepton collection selected in stages; `None` for fully hadronic channels.
    #[serde(default)]
    pub lepton: Option<Collection>,
    /// Lepton stages (e.g. good, single veto, double veto), merged with suffixes.
    #[serde(default)]
    pub lepton_stages: Vec<CutStage>,
    /// Tau cuts, applied cumulatively.
    #[serde(default)]
    pub tau_cuts: Vec<ObjectCut>,
    /// Collection whose selected objects must match a trigger object.
    pub trigger_match: Collection,
    /// ΔR threshold of the trigger match.
    #[serde(default = "default_trigger_match_dr")]
    pub trigger_match_dr: f64,
    /// Steps entering the cutflow, in order. Empty means every step.
    #[serde(default)]
    pub cutflow_steps: Vec<String>,
}

fn default_trigger_match_dr() -> f64 {
    httcp_columnar::DEFAULT_MATCH_THRESHOLD
}

impl ChannelSelection {
    /// Cutflow steps of the usual selection: every cut of the first lepton
    /// stage (suffixed), every tau cut, then the trigger match.
    pub fn default_cutflow_steps(&self) -> Vec<String> {
        let lepton = self.lepton_stages.first().into_iter().flat_map(|stage| {
            stage.cuts.iter().map(move |c| format!("{}_{}", c.name, stage.suffix))
        });
        lepton
            .chain(self.tau_cuts.iter().map(|c| c.name.clone()))
            .chain(std::iter::once(TRIGGER_MATCH_STEP.to_string()))
            .collect()
    }

    /// Check internal consistency.
    pub fn validate(&self, channel: &str, deep_tau: &DeepTau) -> Result<()> {
        if self.lepton.is_none() && !self.lepton_stages.is_empty() {
            return Err(Error::Validation(format!(
                "channel '{channel}' defines lepton stages without a lepton collection"
            )));
        }
        for (i, stage) in self.lepton_stages.iter().enumerate() {
            if self.lepton_stages[..i].iter().any(|s| s.suffix == stage.suffix) {
                return Err(Error::Validation(format!(
                    "channel '{channel}' repeats stage suffix '{}'",
                    stage.suffix
                )));
            }
        }
        for cut in self.lepton_stages.iter().flat_map(|s| &s.cuts).chain(&self.tau_cuts) {
            cut.resolve(deep_tau)?;
        }
        if self.trigger_match_dr.is_nan() || self.trigger_match_dr <= 0.0 {
            return Err(Error::Validation(format!(
                "channel '{channel}' has non-positive trigger match ΔR {}",
                self.trigger_match_dr
            )));
        }
        Ok(())
    }
}
