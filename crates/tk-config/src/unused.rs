//! Unused-key detection against the typed [`KeeperConfig`] shape.
//!
//! A key is unused when [`KeeperConfig`] has no field for it, or when it sits
//! under a top-level section the reading role does not read. Only the
//! outermost unused key is reported: `/legacy` rather than every leaf below it.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::{KeeperConfig, ProcessRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedKeyReport {
    pub role: ProcessRole,
    /// JSON pointers, sorted.
    pub unused_keys: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_keys.is_empty()
    }
}

pub fn report_unused_keys(
    role: ProcessRole,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let shape = KeeperConfig::shape()?;

    let mut unused = Vec::new();
    if let Value::Object(sections) = config_json {
        for (section, body) in sections {
            let ptr = format!("/{}", escape_token(section));
            match shape.get(section) {
                Some(known) if role.reads_section(section) => {
                    collect_unknown(body, known, &ptr, &mut unused)
                }
                _ => unused.push(ptr),
            }
        }
    }
    unused.sort();

    let report = UnusedKeyReport {
        role,
        unused_keys: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS (role={}) unused={}",
            role.as_str(),
            report.unused_keys.join(",")
        );
    }
    Ok(report)
}

fn collect_unknown(doc: &Value, shape: &Value, path: &str, out: &mut Vec<String>) {
    // Leaves (and type mismatches) are the typed loader's problem, not ours.
    let (Value::Object(doc_map), Value::Object(_)) = (doc, shape) else {
        return;
    };
    for (key, child) in doc_map {
        let ptr = format!("{path}/{}", escape_token(key));
        match shape.get(key) {
            Some(known) => collect_unknown(child, known, &ptr, out),
            None => out.push(ptr),
        }
    }
}

/// RFC 6901 token escaping.
fn escape_token(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
