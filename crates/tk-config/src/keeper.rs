//! Typed view over the merged config document.
//!
//! Every section is optional in YAML and falls back to defaults that work
//! against a local development stack.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Thresholds;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeeperConfig {
    pub reconcile: ReconcileSection,
    pub gateway: GatewaySection,
    pub oracle: OracleSection,
    pub db: DbSection,
    pub bus: BusSection,
    pub daemon: DaemonSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSection {
    pub thresholds: Thresholds,
    /// Interval between background reconciliation passes.
    pub scan_interval_secs: u64,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            scan_interval_secs: 60,
        }
    }
}

/// Escrow gateway: table registry and contract reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub base_url: String,
    pub timeout_secs: u64,
    /// NAME of the env var holding the gateway API key, if the gateway wants one.
    pub api_key_env: Option<String>,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8545".to_string(),
            timeout_secs: 10,
            api_key_env: None,
        }
    }
}

/// Game-rules oracle service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub base_url: String,
    pub timeout_secs: u64,
    pub api_key_env: Option<String>,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 5,
            api_key_env: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbSection {
    /// NAME of the env var holding the Postgres URL.
    pub url_env: String,
    pub max_connections: u32,
}

impl Default for DbSection {
    fn default() -> Self {
        Self {
            url_env: "TK_DATABASE_URL".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSection {
    pub capacity: usize,
}

impl Default for BusSection {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSection {
    pub bind_addr: String,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8899".to_string(),
        }
    }
}

impl KeeperConfig {
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let cfg: KeeperConfig =
            serde_json::from_value(config_json.clone()).context("CONFIG_SHAPE_INVALID")?;
        cfg.reconcile.thresholds.validate()?;
        Ok(cfg)
    }

    /// Every key the typed config understands, as a JSON tree of defaults.
    pub fn shape() -> Result<Value> {
        serde_json::to_value(KeeperConfig::default()).context("config shape serialize failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;

    #[test]
    fn empty_document_yields_defaults() {
        let loaded = load_layered_yaml_from_strings(&[""]).unwrap();
        let cfg = loaded.keeper().unwrap();
        assert_eq!(cfg, KeeperConfig::default());
        assert_eq!(cfg.reconcile.thresholds, Thresholds::default());
    }

    #[test]
    fn partial_threshold_override_keeps_other_defaults() {
        let yaml = r#"
reconcile:
  scan_interval_secs: 15
  thresholds:
    kick_after_secs: 120
gateway:
  base_url: "https://escrow.internal"
"#;
        let cfg = load_layered_yaml_from_strings(&[yaml]).unwrap().keeper().unwrap();
        assert_eq!(cfg.reconcile.scan_interval_secs, 15);
        assert_eq!(cfg.reconcile.thresholds.kick_after_secs, 120);
        assert_eq!(cfg.reconcile.thresholds.dispute_window_secs, 600);
        assert_eq!(cfg.gateway.base_url, "https://escrow.internal");
        assert_eq!(cfg.gateway.timeout_secs, 10);
    }

    #[test]
    fn invalid_thresholds_fail_typed_load() {
        let yaml = r#"
reconcile:
  thresholds:
    dispute_react_after_secs: 900
"#;
        let err = load_layered_yaml_from_strings(&[yaml]).unwrap().keeper().unwrap_err();
        assert!(err.to_string().contains("CONFIG_THRESHOLD_INVALID"));
    }
}
