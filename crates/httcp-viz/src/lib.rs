//! # httcp-viz
//!
//! Visualization data artifacts for the httcp analysis.
//!
//! Artifacts are plot-friendly JSON structures (arrays instead of nested
//! objects); drawing them is left to the plotting front end.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Cutflow artifacts (counts and efficiencies per step).
pub mod cutflow;

pub use cutflow::{
    CUTFLOW_SCHEMA_VERSION, CutflowArtifact, CutflowMeta, CutflowSeries, cutflow_artifact,
};
