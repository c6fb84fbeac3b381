//! Scenario: config hash is stable
//!
//! GREEN when:
//! - loading the same YAML twice yields the same hash;
//! - reordering keys does not change the hash;
//! - changing a threshold does change it;
//! - layering is deterministic and the overlay wins.

use tk_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
reconcile:
  scan_interval_secs: 60
  thresholds:
    dispute_react_after_secs: 180
    dispute_window_secs: 600
gateway:
  base_url: "http://escrow-gateway:8545"
  timeout_secs: 10
db:
  url_env: "TK_DATABASE_URL"
"#;

const BASE_YAML_REORDERED: &str = r#"
db:
  url_env: "TK_DATABASE_URL"
gateway:
  timeout_secs: 10
  base_url: "http://escrow-gateway:8545"
reconcile:
  thresholds:
    dispute_window_secs: 600
    dispute_react_after_secs: 180
  scan_interval_secs: 60
"#;

const OVERLAY_YAML: &str = r#"
reconcile:
  scan_interval_secs: 15
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash"
    );
}

#[test]
fn changed_threshold_changes_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[
        BASE_YAML,
        "reconcile:\n  thresholds:\n    dispute_react_after_secs: 120\n",
    ])
    .unwrap();

    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn merged_layers_produce_stable_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);

    let cfg = a.keeper().unwrap();
    assert_eq!(cfg.reconcile.scan_interval_secs, 15, "overlay must win");
    assert_eq!(cfg.reconcile.thresholds.dispute_window_secs, 600);
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn layered_files_on_disk_match_in_memory_strings() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let overlay = dir.path().join("overlay.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&overlay, OVERLAY_YAML).unwrap();

    let base_s = base.to_string_lossy().to_string();
    let overlay_s = overlay.to_string_lossy().to_string();
    let from_disk = tk_config::load_layered_yaml(&[&base_s, &overlay_s]).unwrap();
    let from_mem = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_eq!(from_disk.config_hash, from_mem.config_hash);
}

#[test]
fn missing_file_names_the_path() {
    let err = tk_config::load_layered_yaml(&["/nonexistent/tk/base.yaml"]).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/tk/base.yaml"));
}
