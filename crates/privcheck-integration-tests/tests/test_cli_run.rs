//! File-system tests for the `privcheck run` and `privcheck check`
//! handlers.
//!
//! Each test lays out a small study in a temporary directory (config,
//! taxonomy, domain list, JSON Lines inputs), runs the handler and reads
//! the artifacts back.

use std::path::{Path, PathBuf};

use privcheck_cli::check::{run_check, CheckArgs};
use privcheck_cli::output::MANIFEST_FILE;
use privcheck_cli::run::{run_pipeline, RunArgs};
use privcheck_cli::{exit_code_for, EXIT_CONFIG, EXIT_OPERATIONAL};
use privcheck_core::{sha256_digest, CanonicalBytes};
use serde_json::Value;

const ARTIFACTS: [&str; 6] = [
    "technical_profiles.json",
    "domain_claims.json",
    "verdicts.json",
    "domain_scores.json",
    "metrics.json",
    "error_ledger.json",
];

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

/// A study with two measured Spanish domains, one unmeasured official
/// domain and one malformed cookie line.
fn study(dir: &Path) -> PathBuf {
    write(
        dir,
        "taxonomy.yaml",
        "version: \"2025-01\"\ntrackers:\n  google-analytics.com:\n    owner: Google LLC\n    category: analytics\n    owner_country: US\n",
    );
    write(dir, "es.txt", "# Spain\nsede.gob.es\nboe.es\nagencia.gob.es\n");
    write(
        dir,
        "cookies.jsonl",
        concat!(
            "{\"domain\":\"sede.gob.es\",\"hostname\":\"sede.gob.es\",\"name\":\"JSESSIONID\",\"is_session\":true}\n",
            "{\"domain\":\"sede.gob.es\",\"hostname\":\"www.google-analytics.com\",\"name\":\"_ga\",\"expiry\":\"2026-03-01T00:00:00Z\"}\n",
            "{\"domain\":\"boe.es\",\"hostname\":\"boe.es\",\"name\":\"lang\",\"is_session\":true}\n",
            "{broken\n",
        ),
    );
    write(
        dir,
        "requests.jsonl",
        concat!(
            "{\"domain\":\"sede.gob.es\",\"hostname\":\"www.google-analytics.com\",\"url\":\"https://www.google-analytics.com/g/collect\"}\n",
            "{\"domain\":\"boe.es\",\"hostname\":\"boe.es\",\"url\":\"https://boe.es/app.js\"}\n",
        ),
    );
    write(
        dir,
        "policies.jsonl",
        concat!(
            "{\"domain\":\"sede.gob.es\",\"doc_type\":\"PRIVACY_POLICY\",\"url\":\"https://sede.gob.es/privacidad\",\"declares_cookie_use\":true,\"declares_third_party_sharing\":false}\n",
            "{\"domain\":\"boe.es\",\"doc_type\":\"COOKIE_POLICY\",\"url\":\"https://boe.es/cookies\",\"declares_cookie_use\":\"sí\",\"details\":{\"duration\":\"session\",\"ownership\":\"first\"}}\n",
        ),
    );
    write(
        dir,
        "run.yaml",
        "as_of: \"2025-03-01T00:00:00Z\"\ntaxonomy: taxonomy.yaml\ninputs:\n  cookies: cookies.jsonl\n  requests: requests.jsonl\n  policies: policies.jsonl\nofficial_domains:\n  ES: es.txt\nworkers: 2\n",
    );
    dir.join("run.yaml")
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn run_args(config: PathBuf, out: &Path) -> RunArgs {
    RunArgs {
        config,
        output_dir: Some(out.to_path_buf()),
        workers: None,
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[test]
fn run_writes_every_artifact_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let code = run_pipeline(&run_args(study(dir.path()), &out)).unwrap();
    assert_eq!(code, 0);

    let manifest = read_json(&out.join(MANIFEST_FILE));
    assert_eq!(manifest["asOf"], "2025-03-01T00:00:00Z");
    assert_eq!(manifest["taxonomyVersion"], "2025-01");
    for name in ARTIFACTS {
        let value = read_json(&out.join(name));
        let digest = sha256_digest(&CanonicalBytes::new(&value).unwrap()).to_string();
        assert_eq!(manifest["artifacts"][name]["digest"], digest.as_str(), "{name}");
    }

    let profiles = read_json(&out.join("technical_profiles.json"));
    let domains: Vec<&str> = profiles
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["domain"].as_str().unwrap())
        .collect();
    assert_eq!(domains, ["agencia.gob.es", "boe.es", "sede.gob.es"]);
    assert_eq!(manifest["artifacts"]["technical_profiles.json"]["records"], 3);
}

#[test]
fn run_records_malformed_lines_and_violations() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    run_pipeline(&run_args(study(dir.path()), &out)).unwrap();

    let ledger = read_json(&out.join("error_ledger.json"));
    let unattributed = ledger["unattributed"].as_array().unwrap();
    assert!(unattributed.iter().any(|e| e["source"] == "cookies" && e["line"] == 4));

    let verdicts = read_json(&out.join("verdicts.json"));
    let sharing = verdicts
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["domain"] == "sede.gob.es" && v["ruleId"] == "third_party_sharing")
        .unwrap();
    assert_eq!(sharing["outcome"], "VIOLATION");

    let metrics = read_json(&out.join("metrics.json"));
    assert_eq!(metrics["global"]["domains"], 3);
    assert!(metrics["countries"]["ES"].is_object());
}

#[test]
fn rerun_on_same_inputs_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let config = study(dir.path());
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    run_pipeline(&run_args(config.clone(), &first)).unwrap();
    run_pipeline(&RunArgs {
        config,
        output_dir: Some(second.clone()),
        workers: Some(1),
    })
    .unwrap();

    for name in ARTIFACTS.iter().copied().chain([MANIFEST_FILE]) {
        let a = std::fs::read(first.join(name)).unwrap();
        let b = std::fs::read(second.join(name)).unwrap();
        assert_eq!(a, b, "{name} differs between runs");
    }
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn unknown_rule_is_a_configuration_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = study(dir.path());
    let mut yaml = std::fs::read_to_string(&config).unwrap();
    yaml.push_str("rules: [no_such_rule]\n");
    std::fs::write(&config, yaml).unwrap();

    let err = run_pipeline(&run_args(config, &dir.path().join("out"))).unwrap_err();
    assert_eq!(exit_code_for(&err), EXIT_CONFIG);
    assert!(!dir.path().join("out").exists(), "nothing written before validation");
}

#[test]
fn missing_input_is_an_operational_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = study(dir.path());
    std::fs::remove_file(dir.path().join("requests.jsonl")).unwrap();

    let err = run_pipeline(&run_args(config.clone(), &dir.path().join("out"))).unwrap_err();
    assert_eq!(exit_code_for(&err), EXIT_OPERATIONAL);

    assert_eq!(run_check(&CheckArgs { config }).unwrap(), EXIT_OPERATIONAL);
}

#[test]
fn check_accepts_a_valid_study() {
    let dir = tempfile::tempdir().unwrap();
    let config = study(dir.path());
    assert_eq!(run_check(&CheckArgs { config }).unwrap(), 0);
    assert!(!dir.path().join("out").exists());
}
