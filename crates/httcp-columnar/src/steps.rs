//! Selection step bookkeeping: merging named step masks from several selection
//! stages and flattening them to event-level decisions for the cutflow.

use httcp_core::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::jagged::Jagged;

/// Boolean result of one selection step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepMask {
    /// One decision per object.
    Object(Jagged<bool>),
    /// One decision per event.
    Event(Vec<bool>),
}

impl StepMask {
    /// Number of events covered by the mask.
    pub fn n_events(&self) -> usize {
        match self {
            StepMask::Object(j) => j.n_events(),
            StepMask::Event(v) => v.len(),
        }
    }

    /// Event-level decision: any object true. Event masks are returned as is.
    pub fn flatten(&self) -> Vec<bool> {
        match self {
            StepMask::Object(j) => j.any(),
            StepMask::Event(v) => v.clone(),
        }
    }
}

impl From<Jagged<bool>> for StepMask {
    fn from(j: Jagged<bool>) -> Self {
        StepMask::Object(j)
    }
}

impl From<Vec<bool>> for StepMask {
    fn from(v: Vec<bool>) -> Self {
        StepMask::Event(v)
    }
}

/// Named step masks in insertion order.
pub type SelectionSteps = IndexMap<String, StepMask>;

/// Named event-level step decisions in insertion order.
pub type FlatSteps = IndexMap<String, Vec<bool>>;

/// Output of [`step_extraction`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepExtraction<'a, S> {
    /// Merged, suffixed and flattened steps.
    pub steps: FlatSteps,
    /// Suffixes left over after one was consumed per stage.
    pub remaining_suffixes: &'a [S],
}

/// Reduce every step to one boolean per event.
///
/// Per-object masks become "any object passes"; per-event masks pass through
/// unchanged, so flattening already flat steps is a no-op.
pub fn step_flatten(steps: &SelectionSteps) -> FlatSteps {
    steps.iter().map(|(name, mask)| (name.clone(), mask.flatten())).collect()
}

/// Merge the steps of several stages into one map, renaming every key of
/// stage `i` to `"{key}_{suffixes[i]}"`.
///
/// Returns the merged map and the unconsumed suffixes. Fails when there are
/// fewer suffixes than stages or when two renamed keys collide.
pub fn merge_steps<'a, S: AsRef<str>>(
    stages: &[SelectionSteps],
    suffixes: &'a [S],
) -> Result<(SelectionSteps, &'a [S])> {
    if suffixes.len() < stages.len() {
        return Err(Error::SuffixExhausted { stages: stages.len(), suffixes: suffixes.len() });
    }

    let mut merged = SelectionSteps::with_capacity(stages.iter().map(|s| s.len()).sum());
    for (stage, suffix) in stages.iter().zip(suffixes) {
        let suffix = suffix.as_ref();
        for (key, mask) in stage {
            let new_key = format!("{key}_{suffix}");
            if merged.contains_key(&new_key) {
                return Err(Error::DuplicateStep(new_key));
            }
            merged.insert(new_key, mask.clone());
        }
    }

    Ok((merged, &suffixes[stages.len()..]))
}

/// Merge the steps of several stages (see [`merge_steps`]) and flatten the
/// result (see [`step_flatten`]).
pub fn step_extraction<'a, S: AsRef<str>>(
    stages: &[SelectionSteps],
    suffixes: &'a [S],
) -> Result<StepExtraction<'a, S>> {
    let (merged, remaining_suffixes) = merge_steps(stages, suffixes)?;
    tracing::debug!(
        stages = stages.len(),
        steps = merged.len(),
        remaining = remaining_suffixes.len(),
        "merged selection steps"
    );
    Ok(StepExtraction { steps: step_flatten(&merged), remaining_suffixes })
}
