//! Evaluation of configured cuts on object collections.

use httcp_columnar::{Jagged, SelectionSteps, StepMask};
use httcp_config::ResolvedCut;
use httcp_core::{Error, Result};

use crate::chunk::Object;

/// Per-object decision of a single cut.
pub fn cut_mask(objects: &Jagged<Object>, cut: &ResolvedCut) -> Result<Jagged<bool>> {
    let pass = objects
        .flat()
        .iter()
        .map(|o| o.field(&cut.field).map(|x| cut.passes(x)))
        .collect::<Result<Vec<bool>>>()
        .map_err(|e| Error::Validation(format!("cut '{}': {e}", cut.name)))?;
    Jagged::new(pass, objects.offsets().to_vec())
}

/// Apply `cuts` in order, each on top of the previous ones.
///
/// Returns one cumulative per-object mask per cut, keyed by cut name, and
/// the mask of objects passing every cut (all true for an empty cut list).
pub fn apply_cuts(
    objects: &Jagged<Object>,
    cuts: &[ResolvedCut],
) -> Result<(SelectionSteps, Jagged<bool>)> {
    let mut current = objects.map(|_| true);
    let mut steps = SelectionSteps::with_capacity(cuts.len());
    for cut in cuts {
        current = current.and(&cut_mask(objects, cut)?)?;
        if steps.insert(cut.name.clone(), StepMask::Object(current.clone())).is_some() {
            return Err(Error::DuplicateStep(cut.name.clone()));
        }
    }
    Ok((steps, current))
}
