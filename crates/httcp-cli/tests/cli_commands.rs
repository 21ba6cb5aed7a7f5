use std::path::PathBuf;
use std::process::{Command, Output};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_httcp"))
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").canonicalize().unwrap()
}

fn fixture_path(name: &str) -> PathBuf {
    repo_root().join("tests/fixtures").join(name)
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let out = run(args);
    assert!(
        out.status.success(),
        "{:?} should succeed, stderr={}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("stdout should be valid JSON")
}

#[test]
fn version_prints_crate_version() {
    let out = run(&["version"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("httcp "), "unexpected version output: {stdout}");
}

#[test]
fn config_show_preset() {
    let v = run_json(&["config", "show"]);
    assert_eq!(v["name"], "analysis_httcp");
    assert_eq!(v["configs"].as_array().unwrap().len(), 2);

    let v = run_json(&["config", "show", "--name", "run3_2022_preEE_hlep_rare_limited"]);
    assert_eq!(v["id"], 5);
    assert_eq!(v["limit_dataset_files"], 1);
}

#[test]
fn config_show_from_file() {
    let cfg = fixture_path("analysis.yaml");
    let v = run_json(&[
        "config",
        "show",
        "--config",
        cfg.to_string_lossy().as_ref(),
        "--name",
        "fixture_2022",
    ]);
    assert_eq!(v["id"], 1);
    assert_eq!(v["channels"][0]["name"], "mutau");
}

#[test]
fn config_columns_follow_nano_version() {
    let v = run_json(&["config", "columns", "--name", "run3_2022_preEE_hlep_rare"]);
    let cols: Vec<&str> =
        v["columns"].as_array().unwrap().iter().map(|c| c.as_str().unwrap()).collect();
    assert!(cols.contains(&"Tau.idDeepTau2018v2p5VSjet"));
    assert!(!cols.contains(&"Tau.idDeepTau2017v2p1VSjet"));
    assert_eq!(v["nano_version"], 12);
}

#[test]
fn config_lfns_lists_limited_files() {
    let tmp = tempfile::tempdir().unwrap();
    let ds = tmp.path().join("h_ggf_htt");
    std::fs::create_dir(&ds).unwrap();
    for name in ["c.root", "a.root", "b.root", "readme.txt"] {
        std::fs::write(ds.join(name), b"").unwrap();
    }

    let text = std::fs::read_to_string(fixture_path("analysis.yaml")).unwrap();
    let text = text.replace(
        "      nano_version: 12\n",
        &format!(
            "      nano_version: 12\n      custom:\n        creator: desy\n        location: {}\n",
            tmp.path().display()
        ),
    );
    let cfg = tmp.path().join("analysis.yaml");
    std::fs::write(&cfg, text).unwrap();

    let v = run_json(&[
        "config",
        "lfns",
        "--config",
        cfg.to_string_lossy().as_ref(),
        "--name",
        "fixture_2022",
        "--dataset",
        "h_ggf_htt",
    ]);
    let files: Vec<&str> =
        v["files"].as_array().unwrap().iter().map(|f| f.as_str().unwrap()).collect();
    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("a.root"));
    assert!(files[1].ends_with("b.root"));
}

#[test]
fn config_lfns_requires_private_production() {
    let out = run(&[
        "config",
        "lfns",
        "--name",
        "run3_2022_preEE_hlep_rare",
        "--dataset",
        "h_ggf_htt",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no local file location"));
}

#[test]
fn select_fixture_chunk() {
    let cfg = fixture_path("analysis.yaml");
    let chunk = fixture_path("chunk_mutau.json");
    let v = run_json(&[
        "select",
        "--chunk",
        chunk.to_string_lossy().as_ref(),
        "--channel",
        "mutau",
        "--config",
        cfg.to_string_lossy().as_ref(),
        "--threads",
        "1",
    ]);
    assert_eq!(v["channel_id"], 2);
    assert_eq!(v["chunks"][0]["n_events"], 4);
    assert_eq!(
        v["chunks"][0]["steps"]["trigger_match"],
        serde_json::json!([true, false, false, true])
    );
    assert!(v["chunks"][0]["columns"]["mt"][1].is_null());
    assert_eq!(v["chunks"][0]["columns"]["gen_tau_decay_mode"], serde_json::json!([1, -1, -9, 10]));

    let steps = v["cutflow"]["steps"].as_array().unwrap();
    assert_eq!(steps[0]["name"], "Initial");
    assert_eq!(steps.last().unwrap()["entries"], 1);
}

#[test]
fn cutflow_artifact_over_two_chunks() {
    let cfg = fixture_path("analysis.yaml");
    let chunk = fixture_path("chunk_mutau.json");
    let chunk = chunk.to_string_lossy();
    let v = run_json(&[
        "cutflow",
        "--chunk",
        chunk.as_ref(),
        chunk.as_ref(),
        "--channel",
        "mutau",
        "--config",
        cfg.to_string_lossy().as_ref(),
        "--series",
        "h_ggf_htt",
    ]);
    assert_eq!(v["schema_version"], "httcp_cutflow_v0");
    assert_eq!(v["meta"]["tool"], "httcp");
    assert_eq!(v["channel"], "mutau");
    assert_eq!(v["steps"].as_array().unwrap().len(), 9);

    let s = &v["series"][0];
    assert_eq!(s["name"], "h_ggf_htt");
    assert_eq!(s["counts"], serde_json::json!([8, 4, 4, 4, 4, 4, 4, 2, 2]));
    assert_eq!(s["efficiency"][7], 0.25);
    assert_eq!(s["relative_efficiency"].as_array().unwrap().len(), 8);
    assert_eq!(s["relative_efficiency"][0], 0.5);
}

#[test]
fn select_unknown_channel_fails() {
    let chunk = fixture_path("chunk_mutau.json");
    let out = run(&["select", "--chunk", chunk.to_string_lossy().as_ref(), "--channel", "emu"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no channel 'emu'"));
}

#[test]
fn select_missing_field_fails() {
    // the built-in mutau selection cuts on mediumId, which the fixture chunk lacks
    let chunk = fixture_path("chunk_mutau.json");
    let out = run(&["select", "--chunk", chunk.to_string_lossy().as_ref(), "--channel", "mutau"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("mediumId"));
}
