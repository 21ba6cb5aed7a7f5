//! Built-in analysis setup for the Run 3 2022 pre-EE data set.

use httcp_core::{Error, Result};
use indexmap::IndexMap;

use crate::analysis::Analysis;
use crate::campaign::Campaign;
use crate::columns::{ColumnRule, VersionedColumn};
use crate::config::{
    Channel, Config, Dataset, Defaults, ExternalFile, GenTauSettings, Luminosity, Process, Shift,
    TaskVersion, verify_config_processes,
};
use crate::cuts::{ChannelSelection, CmpOp, Collection, CutStage, ObjectCut};
use crate::triggers::{met_filters_run3, triggers_run3_2022_pre_ee};
use crate::working_points::{BtagCuts, BtagWorkingPoints, DeepTau, DeepTauDiscriminant};

/// Directory holding correction files, relative to the working directory.
pub const DEFAULT_CORRECTIONS_DIR: &str = "corrections";

/// Name of the Run 3 2022 pre-EE campaign.
pub const RUN3_2022_PRE_EE: &str = "run3_2022_preEE_hlep_rare";

const BASH_SANDBOX: &str = "$CF_BASE/sandboxes/cf.sh";
const CMSSW_SANDBOX: &str = "$CF_BASE/sandboxes/cmssw_default.sh";

/// The H→ττ CP analysis with the full and the file-limited 2022 pre-EE configs.
pub fn analysis_httcp() -> Result<Analysis> {
    analysis_with_configs(
        campaign_run3_2022_pre_ee(),
        &[
            (RUN3_2022_PRE_EE.to_string(), 4, None),
            (format!("{RUN3_2022_PRE_EE}_limited"), 5, Some(1)),
        ],
    )
}

/// `(name, id, limit_dataset_files)` of each 2022 pre-EE config to build.
fn analysis_with_configs(
    campaign: Campaign,
    configs: &[(String, u32, Option<u32>)],
) -> Result<Analysis> {
    let mut ana = Analysis {
        name: "analysis_httcp".into(),
        id: 1,
        versions: IndexMap::new(),
        bash_sandboxes: Vec::new(),
        cmssw_sandboxes: vec![CMSSW_SANDBOX.into()],
        config_groups: IndexMap::new(),
        configs: Vec::new(),
    };
    ana.add_bash_sandbox(BASH_SANDBOX);

    for (name, id, limit) in configs {
        ana.configs.push(run3_2022_pre_ee(campaign.clone(), name, *id, *limit)?);
    }
    ana.finalize()?;
    Ok(ana)
}

/// Campaign metadata of the 2022 pre-EE NanoAOD production.
pub fn campaign_run3_2022_pre_ee() -> Campaign {
    Campaign { name: RUN3_2022_PRE_EE.into(), year: 2022, ecm: 13.6, nano_version: 12, custom: None }
}

/// Processes known for the campaign, with plot colors.
fn process_catalog() -> Vec<Process> {
    [
        ("h_ggf_htt", (51, 53, 204)),
        ("dy_lep", (223, 102, 72)),
        ("wj", (201, 89, 84)),
        ("tt_sl", (153, 153, 204)),
        ("tt_dl", (184, 184, 227)),
        ("tt_fh", (87, 87, 141)),
        ("ww", (102, 204, 102)),
        ("wz", (49, 157, 49)),
        ("zz", (120, 214, 120)),
        ("vv", (102, 204, 102)),
    ]
    .into_iter()
    .map(|(name, (r, g, b))| Process { name: name.into(), is_mc: true, color: Some([r, g, b]) })
    .collect()
}

/// Datasets known for the campaign.
fn dataset_catalog() -> Vec<Dataset> {
    vec![Dataset {
        name: "h_ggf_htt".into(),
        process: "h_ggf_htt".into(),
        is_data: false,
        key: "h_ggf_htt".into(),
        n_files: None,
    }]
}

/// Build the 2022 pre-EE config for `campaign`.
///
/// `limit_dataset_files` caps the number of files per dataset, for quick tests.
pub fn run3_2022_pre_ee(
    campaign: Campaign,
    name: &str,
    id: u32,
    limit_dataset_files: Option<u32>,
) -> Result<Config> {
    let year = campaign.year;

    let catalog = process_catalog();
    let processes = ["h_ggf_htt"]
        .iter()
        .map(|p| {
            catalog.iter().find(|c| c.name == *p).cloned().ok_or_else(|| {
                Error::Validation(format!("process '{p}' not known in campaign '{}'", campaign.name))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let datasets = dataset_catalog();

    let corr = DEFAULT_CORRECTIONS_DIR;
    let mut external_files = IndexMap::new();
    external_files.insert(
        "lumi".to_string(),
        ExternalFile::Group(IndexMap::from([
            (
                "golden".to_string(),
                ExternalFile::Versioned(
                    format!("{corr}/Cert_Collisions2022_355100_362760_Golden.json").into(),
                    "v1".into(),
                ),
            ),
            (
                "normtag".to_string(),
                ExternalFile::Versioned(format!("{corr}/normtag_PHYSICS.json").into(), "v1".into()),
            ),
        ])),
    );
    external_files.insert(
        "pileup".to_string(),
        ExternalFile::Group(IndexMap::from([
            (
                "data".to_string(),
                ExternalFile::Path(format!("{corr}/Data_PileUp_2022_preEE.root").into()),
            ),
            ("mc".to_string(), ExternalFile::Path(format!("{corr}/MC_PileUp_2022.root").into())),
        ])),
    );
    external_files.insert(
        "muon_correction".to_string(),
        ExternalFile::Path(format!("{corr}/muon_SFs_2022_preEE.root").into()),
    );
    external_files.insert(
        "tau_correction".to_string(),
        ExternalFile::Path(format!("{corr}/tau_DeepTau2018v2p5_2022_preEE.json.gz").into()),
    );

    let versions = [
        "cf.CalibrateEvents",
        "cf.SelectEvents",
        "cf.MergeSelectionStats",
        "cf.MergeSelectionMasks",
        "cf.ReduceEvents",
        "cf.MergeReductionStats",
        "cf.MergeReducedEvents",
    ]
    .into_iter()
    .map(|f| (f.to_string(), TaskVersion::FromCli))
    .collect();

    let mut cfg = Config {
        name: name.into(),
        id,
        campaign,
        limit_dataset_files,
        processes,
        datasets,
        channels: vec![
            Channel { name: "etau".into(), id: 1 },
            Channel { name: "mutau".into(), id: 2 },
            Channel { name: "tautau".into(), id: 4 },
        ],
        shifts: vec![Shift { name: "nominal".into(), id: 0 }],
        defaults: Defaults {
            calibrator: "main".into(),
            selector: "main".into(),
            producer: "main".into(),
            ml_model: None,
            inference_model: Some("example".into()),
            categories: vec!["incl".into()],
            variables: vec!["event".into(), "channel_id".into()],
            weight_producer: "main".into(),
        },
        process_groups: IndexMap::from([
            ("diboson".to_string(), vec!["ww".into(), "wz".into(), "zz".into()]),
            ("tt".to_string(), vec!["tt_sl".into(), "tt_dl".into(), "tt_fh".into()]),
        ]),
        dataset_groups: IndexMap::new(),
        category_groups: IndexMap::new(),
        variable_groups: IndexMap::new(),
        shift_groups: IndexMap::new(),
        selector_step_groups: IndexMap::from([(
            "default".to_string(),
            ["json", "met_filter", "dl_res_veto", "trigger", "lepton", "jet"]
                .into_iter()
                .map(String::from)
                .collect(),
        )]),
        validate_dataset_lfns: false,
        luminosity: Luminosity {
            value: 7980.4,
            uncertainties: IndexMap::from([("lumi_13p6TeV_2022".to_string(), 0.014)]),
        },
        deep_tau: deep_tau_2018v2p5(),
        btag_working_points: btag_working_points(),
        external_files,
        reduced_file_size: Some(512.0),
        versions,
        keep_columns: keep_columns(),
        selection: channel_selections(),
        gen_tau: GenTauSettings::default(),
        triggers: triggers_run3_2022_pre_ee(),
        met_filters: met_filters_run3(),
    };

    verify_config_processes(&cfg, true)?;
    cfg.finalize()?;
    tracing::debug!(config = %cfg.name, year, datasets = cfg.datasets.len(), "config built");
    Ok(cfg)
}

fn deep_tau_2018v2p5() -> DeepTau {
    let vs_e_jet_wps = ["VVVLoose", "VVLoose", "VLoose", "Loose", "Medium", "Tight", "VTight", "VVTight"]
        .into_iter()
        .zip(1u8..)
        .map(|(wp, v)| (wp.to_string(), v))
        .collect();
    let vs_mu_wps = ["VLoose", "Loose", "Medium", "Tight"]
        .into_iter()
        .zip(1u8..)
        .map(|(wp, v)| (wp.to_string(), v))
        .collect();
    DeepTau {
        tagger: "DeepTau2018v2p5".into(),
        vs_e: "VVLoose".into(),
        vs_mu: "Tight".into(),
        vs_jet: "Medium".into(),
        vs_e_jet_wps,
        vs_mu_wps,
    }
}

fn btag_working_points() -> BtagWorkingPoints {
    let mut wps = BtagWorkingPoints::default();
    wps.0.insert(
        2016,
        IndexMap::from([
            ("deepjet".to_string(), BtagCuts { loose: 0.0532, medium: 0.3040, tight: 0.7476 }),
            ("deepcsv".to_string(), BtagCuts { loose: 0.1355, medium: 0.4506, tight: 0.7738 }),
        ]),
    );
    wps.0.insert(
        2022,
        IndexMap::from([(
            "deepjet".to_string(),
            BtagCuts { loose: 0.0583, medium: 0.3086, tight: 0.7183 },
        )]),
    );
    wps
}

fn keep_columns() -> IndexMap<String, Vec<ColumnRule>> {
    let mut rules: Vec<ColumnRule> = [
        "run",
        "luminosityBlock",
        "event",
        "channel_id",
        "PuppiMET.pt",
        "PuppiMET.phi",
        "Muon.pt",
        "Muon.eta",
        "Muon.phi",
        "Muon.mass",
        "Muon.charge",
        "Muon.pfRelIso04_all",
        "Electron.pt",
        "Electron.eta",
        "Electron.phi",
        "Electron.mass",
        "Electron.charge",
        "Tau.pt",
        "Tau.eta",
        "Tau.phi",
        "Tau.mass",
        "Tau.charge",
        "Tau.decayMode",
        "TrigObj.pt",
        "TrigObj.eta",
        "TrigObj.phi",
        "TrigObj.id",
    ]
    .into_iter()
    .map(|c| ColumnRule::Always(c.into()))
    .collect();
    rules.extend([
        ColumnRule::Versioned(VersionedColumn::IfNanoV9("Tau.idDeepTau2017v2p1VSjet".into())),
        ColumnRule::Versioned(VersionedColumn::IfNanoV9("Tau.idDeepTau2017v2p1VSe".into())),
        ColumnRule::Versioned(VersionedColumn::IfNanoV9("Tau.idDeepTau2017v2p1VSmu".into())),
        ColumnRule::Versioned(VersionedColumn::IfNanoV11("Tau.idDeepTau2018v2p5VSjet".into())),
        ColumnRule::Versioned(VersionedColumn::IfNanoV11("Tau.idDeepTau2018v2p5VSe".into())),
        ColumnRule::Versioned(VersionedColumn::IfNanoV11("Tau.idDeepTau2018v2p5VSmu".into())),
    ]);
    IndexMap::from([("cf.ReduceEvents".to_string(), rules)])
}

fn tau_cuts(pt_min: f64) -> Vec<ObjectCut> {
    vec![
        ObjectCut::new(format!("tau_pt_{pt_min}"), "pt", CmpOp::Gt, pt_min),
        ObjectCut::new("tau_eta_2p3", "eta", CmpOp::Lt, 2.3).abs(),
        ObjectCut::new("tau_dz_0p2", "dz", CmpOp::Lt, 0.2).abs(),
        ObjectCut::deep_tau("DeepTauVSjet", DeepTauDiscriminant::VsJet),
        ObjectCut::deep_tau("DeepTauVSe", DeepTauDiscriminant::VsE),
        ObjectCut::deep_tau("DeepTauVSmu", DeepTauDiscriminant::VsMu),
        ObjectCut::one_of("DecayMode", "decayMode", &[0.0, 1.0, 10.0, 11.0]),
    ]
}

fn veto_stages(
    flavour: &str,
    iso_field: &str,
    pt_single: f64,
    pt_double: f64,
    eta_max: f64,
) -> [CutStage; 2] {
    let stage = |suffix: &str, pt: f64| CutStage {
        suffix: suffix.into(),
        cuts: vec![
            ObjectCut::new(format!("{flavour}_pt_{pt}"), "pt", CmpOp::Gt, pt),
            ObjectCut::new(format!("{flavour}_eta"), "eta", CmpOp::Lt, eta_max).abs(),
            ObjectCut::new(format!("{flavour}_iso"), iso_field, CmpOp::Lt, 0.3),
        ],
    };
    [stage("single_veto", pt_single), stage("double_veto", pt_double)]
}

fn channel_selections() -> IndexMap<String, ChannelSelection> {
    let [mu_single, mu_double] = veto_stages("muon", "pfRelIso04_all", 10.0, 15.0, 2.4);
    let mutau = ChannelSelection {
        lepton: Some(Collection::Muon),
        lepton_stages: vec![
            CutStage {
                suffix: "good".into(),
                cuts: vec![
                    ObjectCut::new("muon_pt_26", "pt", CmpOp::Gt, 26.0),
                    ObjectCut::new("muon_eta_2p4", "eta", CmpOp::Lt, 2.4).abs(),
                    ObjectCut::new("mediumID", "mediumId", CmpOp::Ge, 1.0),
                    ObjectCut::new("muon_dxy_0p045", "dxy", CmpOp::Lt, 0.045).abs(),
                    ObjectCut::new("muon_dz_0p2", "dz", CmpOp::Lt, 0.2).abs(),
                    ObjectCut::new("muon_iso_0p15", "pfRelIso04_all", CmpOp::Lt, 0.15),
                ],
            },
            mu_single,
            mu_double,
        ],
        tau_cuts: tau_cuts(20.0),
        trigger_match: Collection::Muon,
        trigger_match_dr: 0.5,
        cutflow_steps: Vec::new(),
    };

    let [e_single, e_double] = veto_stages("electron", "pfRelIso03_all", 10.0, 15.0, 2.5);
    let etau = ChannelSelection {
        lepton: Some(Collection::Electron),
        lepton_stages: vec![
            CutStage {
                suffix: "good".into(),
                cuts: vec![
                    ObjectCut::new("electron_pt_25", "pt", CmpOp::Gt, 25.0),
                    ObjectCut::new("electron_eta_2p1", "eta", CmpOp::Lt, 2.1).abs(),
                    ObjectCut::new("electron_dxy_0p045", "dxy", CmpOp::Lt, 0.045).abs(),
                    ObjectCut::new("electron_dz_0p2", "dz", CmpOp::Lt, 0.2).abs(),
                    ObjectCut::new("electron_mva_iso_wp80", "mvaIso_WP80", CmpOp::Ge, 1.0),
                ],
            },
            e_single,
            e_double,
        ],
        tau_cuts: tau_cuts(20.0),
        trigger_match: Collection::Electron,
        trigger_match_dr: 0.5,
        cutflow_steps: Vec::new(),
    };

    let tautau = ChannelSelection {
        lepton: None,
        lepton_stages: Vec::new(),
        tau_cuts: tau_cuts(40.0),
        trigger_match: Collection::Tau,
        trigger_match_dr: 0.5,
        cutflow_steps: Vec::new(),
    };

    // Veto stages stay out of the cutflow.
    [("etau", etau), ("mutau", mutau), ("tautau", tautau)]
        .into_iter()
        .map(|(name, mut sel)| {
            sel.cutflow_steps = sel.default_cutflow_steps();
            (name.to_string(), sel)
        })
        .collect()
}
