use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use httcp_config::{Analysis, CmpOp, Collection, NanoVersion, presets};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures").join(name)
}

#[test]
fn yaml_fixture_loads_and_finalizes() {
    let ana = Analysis::from_path(&fixture("analysis.yaml")).unwrap();
    assert_eq!(ana.name, "analysis_fixture");
    let cfg = ana.config("fixture_2022").unwrap();

    assert_eq!(cfg.campaign.nano(), NanoVersion::V11Plus);
    assert_eq!(cfg.dataset("h_ggf_htt").unwrap().n_files, Some(2));
    assert_eq!(cfg.dataset("data_mu_c").unwrap().n_files, Some(2));
    assert!(!cfg.process("data").unwrap().is_mc);
    assert_abs_diff_eq!(
        cfg.luminosity.uncertainty("lumi_13p6TeV_2022").unwrap(),
        111.7256,
        epsilon = 1e-9
    );

    assert_eq!(cfg.task_version("cf.ReduceEvents", Some("v9")).as_deref(), Some("v2"));
    assert_eq!(cfg.task_version("cf.SelectEvents", Some("v9")).as_deref(), Some("v9"));
    assert_eq!(
        cfg.keep_columns_for("cf.ReduceEvents"),
        vec!["event", "Muon.pt", "Tau.idDeepTau2018v2p5VSjet"]
    );
    assert!(cfg.external_file("lumi.golden").unwrap().ends_with("golden.json"));

    let mutau = cfg.selection_for("mutau").unwrap();
    assert_eq!(mutau.lepton, Some(Collection::Muon));
    assert_eq!(mutau.lepton_stages[0].cuts[1].op, CmpOp::Lt);
    assert!(mutau.lepton_stages[0].cuts[1].abs);
    assert_eq!(mutau.cutflow_steps.len(), 8);

    let tautau = cfg.selection_for("tautau").unwrap();
    assert_eq!(tautau.trigger_match, Collection::Tau);
    assert_abs_diff_eq!(tautau.trigger_match_dr, 0.5);

    assert_eq!(cfg.triggers_for("mutau").next().unwrap().name, "HLT_IsoMu24");
    assert_eq!(cfg.trigger_legs("mutau", 13)[0].min_pt, 25.0);
    assert_eq!(cfg.triggers_for("tautau").count(), 0);
    assert_eq!(cfg.met_filters, vec!["Flag.goodVertices", "Flag.eeBadScFilter"]);
}

#[test]
fn trigger_in_unknown_channel_is_rejected() {
    let text = std::fs::read_to_string(fixture("analysis.yaml")).unwrap();
    let broken = text.replace("channels: [mutau]", "channels: [etau]");
    assert_ne!(text, broken);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, broken).unwrap();
    let err = Analysis::from_path(&path).unwrap_err().to_string();
    assert!(err.contains("trigger 'HLT_IsoMu24' used in unknown channel 'etau'"), "{err}");
}

#[test]
fn selection_for_unknown_channel_is_rejected() {
    let text = std::fs::read_to_string(fixture("analysis.yaml")).unwrap();
    let broken = text.replace("      tautau:\n        tau_cuts:", "      emu:\n        tau_cuts:");
    assert_ne!(text, broken);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, broken).unwrap();
    let err = Analysis::from_path(&path).unwrap_err().to_string();
    assert!(err.contains("selection for unknown channel 'emu'"), "{err}");
}

#[test]
fn unknown_working_point_is_rejected() {
    let text = std::fs::read_to_string(fixture("analysis.yaml")).unwrap();
    let broken = text.replace("vs_jet: Medium", "vs_jet: VTight");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, broken).unwrap();
    let err = Analysis::from_path(&path).unwrap_err().to_string();
    assert!(err.contains("working point 'VTight'"), "{err}");
}

#[test]
fn preset_survives_json_round_trip() {
    let ana = presets::analysis_httcp().unwrap();
    let json = serde_json::to_string_pretty(&ana).unwrap();
    let back: Analysis = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ana);
}
