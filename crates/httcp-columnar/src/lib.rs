//! # httcp-columnar
//!
//! Columnar helpers for the H→ττ analysis: a ragged per-event array type and
//! the small set of physics transformations run on every event chunk.
//!
//! ## Example
//!
//! ```
//! use httcp_columnar::{Jagged, PtEtaPhiM, trigger_object_matching};
//!
//! let taus = Jagged::from_nested(vec![vec![PtEtaPhiM::new(40.0, 0.5, 1.0, 1.77)]]);
//! let trig = Jagged::from_nested(vec![vec![PtEtaPhiM::new(35.0, 0.52, 1.01, 0.0)]]);
//! let matched = trigger_object_matching(&taus, &trig, 0.5, 2).unwrap();
//! assert_eq!(matched.event(0), &[true]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decay_mode;
pub mod jagged;
pub mod kinematics;
pub mod matching;
pub mod steps;
pub mod vector;

pub use decay_mode::{HadronicRule, gen_tau_decay_mode};
pub use jagged::Jagged;
pub use kinematics::{transverse_mass, transverse_mass_jagged, transverse_mass_per_event};
pub use matching::{
    DEFAULT_MATCH_AXIS, DEFAULT_MATCH_THRESHOLD, MetricTable, metric_table,
    trigger_object_matching,
};
pub use steps::{
    FlatSteps, SelectionSteps, StepExtraction, StepMask, merge_steps, step_extraction,
    step_flatten,
};
pub use vector::{Azimuthal, Directional, Met, PtEtaPhiM, wrap_phi};
