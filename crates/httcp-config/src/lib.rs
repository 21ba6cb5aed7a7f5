//! # httcp-config
//!
//! Analysis metadata for the H→ττ CP analysis: campaigns, processes,
//! datasets, channels, luminosity, identification working points, HLT
//! triggers, MET filters, external correction files, selection cuts and task
//! versions.
//!
//! Configurations are either loaded from YAML/JSON ([`Analysis::from_path`])
//! or taken from the built-in presets ([`presets::analysis_httcp`]).
//!
//! ## Example
//!
//! ```
//! let ana = httcp_config::presets::analysis_httcp().unwrap();
//! let cfg = ana.config("run3_2022_preEE_hlep_rare_limited").unwrap();
//! assert_eq!(cfg.channel("mutau").unwrap().id, 2);
//! assert_eq!(cfg.deep_tau.vs_jet_threshold().unwrap(), 5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod campaign;
pub mod columns;
pub mod config;
pub mod cuts;
pub mod lfns;
pub mod presets;
pub mod triggers;
pub mod working_points;

pub use analysis::Analysis;
pub use campaign::{Campaign, CustomSite, NanoVersion};
pub use columns::{ColumnRule, VersionedColumn, resolve_columns};
pub use config::{
    Channel, Config, Dataset, Defaults, ExternalFile, GenTauSettings, Luminosity, Process, Shift,
    TaskVersion, verify_config_processes,
};
pub use cuts::{
    ChannelSelection, CmpOp, Collection, CutStage, MET_FILTER_STEP, ObjectCut, ResolvedCut,
    TRIGGER_MATCH_STEP,
};
pub use lfns::dataset_lfns;
pub use triggers::{Trigger, TriggerLeg};
pub use working_points::{BtagWorkingPoint, BtagWorkingPoints, DeepTau, DeepTauDiscriminant};
