//! Layer loading: merge YAML documents, refuse literal secrets, hash the
//! canonical result.

use std::fs;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::KeeperConfig;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// SHA-256 (hex) of `canonical_json`.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view over the merged document.
    pub fn keeper(&self) -> Result<KeeperConfig> {
        KeeperConfig::from_config_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}")))
        .collect::<Result<Vec<String>>>()?;

    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let layer: Value = serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        // An empty document is an empty layer.
        if !layer.is_null() {
            overlay(&mut merged, layer);
        }
    }

    if let Some((leaf, kind)) = find_secret(&merged, "") {
        bail!("CONFIG_SECRET_DETECTED leaf={leaf} kind={kind} value=REDACTED");
    }

    // serde_json's default map is ordered, so this is independent of YAML key order.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));

    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; anything else in `layer` replaces what is there.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, val) in layer_map {
                match base_map.get_mut(&key) {
                    Some(slot) => overlay(slot, val),
                    None => {
                        base_map.insert(key, val);
                    }
                }
            }
        }
        (slot, other) => *slot = other,
    }
}

/// First string leaf that looks like a credential, as `(pointer, kind)`.
fn find_secret(v: &Value, path: &str) -> Option<(String, &'static str)> {
    match v {
        Value::String(s) => secret_kind(s).map(|kind| (path.to_string(), kind)),
        Value::Object(map) => map
            .iter()
            .find_map(|(k, child)| find_secret(child, &format!("{path}/{k}"))),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, child)| find_secret(child, &format!("{path}/{i}"))),
        _ => None,
    }
}

/// Credentials this service could plausibly be handed: a database URL, a
/// PEM block, a raw 32-byte signing key, or a bearer-style API key.
fn secret_kind(s: &str) -> Option<&'static str> {
    let t = s.trim();
    if t.starts_with("postgres://") || t.starts_with("postgresql://") {
        return Some("database_url");
    }
    if t.starts_with("-----BEGIN") {
        return Some("pem");
    }
    let hex_body = t.strip_prefix("0x").unwrap_or(t);
    if hex_body.len() == 64 && hex_body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Some("private_key");
    }
    if (t.starts_with("sk-") || t.starts_with("sk_")) && t.len() >= 16 {
        return Some("api_key");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn later_layers_override_earlier_ones() {
        let base = "reconcile:\n  thresholds:\n    dispute_window_secs: 600\n    kick_after_secs: 300\n";
        let overlay = "reconcile:\n  thresholds:\n    kick_after_secs: 120\n";
        let loaded = load_layered_yaml_from_strings(&[base, overlay]).unwrap();

        assert_eq!(
            loaded.config_json.pointer("/reconcile/thresholds/kick_after_secs"),
            Some(&json!(120))
        );
        assert_eq!(
            loaded.config_json.pointer("/reconcile/thresholds/dispute_window_secs"),
            Some(&json!(600))
        );
    }

    #[test]
    fn scalar_layer_replaces_section() {
        let mut base = json!({ "gateway": { "base_url": "http://a", "timeout_secs": 3 } });
        overlay(&mut base, json!({ "gateway": "off" }));
        assert_eq!(base, json!({ "gateway": "off" }));
    }

    #[test]
    fn database_url_literal_is_treated_as_secret() {
        let yaml = "db:\n  url_env: \"postgres://user:pw@host/db\"\n";
        let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err();
        assert!(err.to_string().contains("CONFIG_SECRET_DETECTED"));
        assert!(err.to_string().contains("kind=database_url"));
        assert!(!err.to_string().contains("pw@host"));
    }

    #[test]
    fn signing_key_is_a_secret_but_table_address_is_not() {
        let key = format!("0x{}", "ab".repeat(32));
        assert_eq!(secret_kind(&key), Some("private_key"));
        assert_eq!(secret_kind("0x00000000000000000000000000000000000000aa"), None);
        assert_eq!(secret_kind("TK_DATABASE_URL"), None);
    }
}
