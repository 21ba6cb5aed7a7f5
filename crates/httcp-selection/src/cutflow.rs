//! Sequential event counting over named selection steps.

use httcp_columnar::FlatSteps;
use httcp_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Name of the entry counting every event before any step.
pub const INITIAL_STEP: &str = "Initial";

/// Events surviving all steps up to and including one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutflowStep {
    /// Step name.
    pub name: String,
    /// Raw event count.
    pub entries: u64,
    /// Sum of event weights.
    pub sumw: f64,
    /// Sum of squared event weights.
    pub sumw2: f64,
}

impl CutflowStep {
    fn empty(name: &str) -> Self {
        Self { name: name.to_string(), entries: 0, sumw: 0.0, sumw2: 0.0 }
    }

    fn fill(&mut self, w: f64) {
        self.entries += 1;
        self.sumw += w;
        self.sumw2 += w * w;
    }
}

/// Cutflow: [`INITIAL_STEP`] followed by one entry per step, each counting
/// the events passing the logical AND of that step and all earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cutflow {
    /// Entries in step order.
    pub steps: Vec<CutflowStep>,
}

impl Cutflow {
    /// Count `n_events` events through `order` (every step of `steps` when
    /// `order` is empty).
    ///
    /// Fails when a named step is missing, when a step or the weights do not
    /// cover `n_events` events, or when a weight is not finite.
    pub fn count(
        n_events: usize,
        steps: &FlatSteps,
        order: &[String],
        weights: Option<&[f64]>,
    ) -> Result<Self> {
        let names: Vec<&str> = if order.is_empty() {
            steps.keys().map(String::as_str).collect()
        } else {
            order.iter().map(String::as_str).collect()
        };

        let masks = names
            .iter()
            .map(|name| {
                let mask = steps.get(*name).ok_or_else(|| {
                    Error::Validation(format!(
                        "cutflow step '{name}' not produced by the selection (have: {})",
                        steps.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
                    ))
                })?;
                if mask.len() != n_events {
                    return Err(Error::Shape(format!(
                        "cutflow step '{name}' has {} events, expected {n_events}",
                        mask.len()
                    )));
                }
                Ok(mask.as_slice())
            })
            .collect::<Result<Vec<&[bool]>>>()?;

        if let Some(w) = weights {
            if w.len() != n_events {
                return Err(Error::Shape(format!(
                    "{} weights for {n_events} events",
                    w.len()
                )));
            }
            if let Some(i) = w.iter().position(|x| !x.is_finite()) {
                return Err(Error::Validation(format!("non-finite weight at event {i}")));
            }
        }

        let mut out = Vec::with_capacity(names.len() + 1);
        out.push(CutflowStep::empty(INITIAL_STEP));
        out.extend(names.iter().map(|n| CutflowStep::empty(n)));

        for event in 0..n_events {
            let w = weights.map_or(1.0, |w| w[event]);
            out[0].fill(w);
            for (i, mask) in masks.iter().enumerate() {
                if !mask[event] {
                    break;
                }
                out[i + 1].fill(w);
            }
        }

        Ok(Self { steps: out })
    }

    /// Add the counts of another cutflow with the same steps.
    pub fn merge(&mut self, other: &Cutflow) -> Result<()> {
        if self.names().ne(other.names()) {
            return Err(Error::Validation(format!(
                "cannot merge cutflows with different steps: [{}] vs [{}]",
                self.names().collect::<Vec<_>>().join(", "),
                other.names().collect::<Vec<_>>().join(", ")
            )));
        }
        for (a, b) in self.steps.iter_mut().zip(&other.steps) {
            a.entries += b.entries;
            a.sumw += b.sumw;
            a.sumw2 += b.sumw2;
        }
        Ok(())
    }

    /// Step names, starting with [`INITIAL_STEP`].
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.steps.iter().map(|s| s.name.as_str())
    }

    /// Raw counts per step.
    pub fn entries(&self) -> Vec<u64> {
        self.steps.iter().map(|s| s.entries).collect()
    }

    /// Weighted counts per step.
    pub fn sumw(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.sumw).collect()
    }
}
