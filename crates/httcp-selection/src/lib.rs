//! # httcp-selection
//!
//! Event chunk model, per-channel object selection and cutflow counting.
//!
//! A [`ChannelSelector`] is built once per channel from an
//! [`httcp_config::Config`] and then applied to any number of
//! [`EventChunk`]s; every run yields event-level step decisions, derived
//! columns and a [`Cutflow`]. Cutflows of several chunks are combined with
//! [`Cutflow::merge`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod cutflow;
pub mod object_cuts;
pub mod selector;

pub use chunk::{EventChunk, Object};
pub use cutflow::{Cutflow, CutflowStep, INITIAL_STEP};
pub use object_cuts::{apply_cuts, cut_mask};
pub use selector::{ChannelSelector, DerivedColumns, SelectionResult};
