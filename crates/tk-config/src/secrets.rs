//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"TK_DATABASE_URL"`).
//! - At startup, callers invoke [`resolve_secrets`] once and pass the result
//!   into constructors; nothing else reads these env vars.
//! - `Debug` output redacts every value.
//! - Error messages name the env var, never its value.
//!
//! # Role-aware enforcement
//! Both roles need the database URL (the store is where the last hand is
//! read from and where the control outbox lives). Gateway and oracle keys
//! are required only when the config names an env var for them.

use anyhow::{bail, Result};

use crate::{KeeperConfig, ProcessRole};

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub database_url: String,
    pub gateway_api_key: Option<String>,
    pub oracle_api_key: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url", &"<REDACTED>")
            .field(
                "gateway_api_key",
                &self.gateway_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "oracle_api_key",
                &self.oracle_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Returns `None` if the variable is unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn require_env(role: ProcessRole, var_name: &str, what: &str) -> Result<String> {
    match resolve_env(var_name) {
        Some(v) => Ok(v),
        None => bail!(
            "SECRETS_MISSING role={}: required env var '{}' ({}) is not set or empty",
            role.as_str(),
            var_name,
            what,
        ),
    }
}

/// Resolve all secrets named by `cfg` from the environment.
pub fn resolve_secrets(cfg: &KeeperConfig, role: ProcessRole) -> Result<ResolvedSecrets> {
    let database_url = require_env(role, &cfg.db.url_env, "database url")?;

    let gateway_api_key = match cfg.gateway.api_key_env.as_deref() {
        Some(name) => Some(require_env(role, name, "gateway api key")?),
        None => None,
    };
    let oracle_api_key = match cfg.oracle.api_key_env.as_deref() {
        Some(name) => Some(require_env(role, name, "oracle api key")?),
        None => None,
    };

    Ok(ResolvedSecrets {
        database_url,
        gateway_api_key,
        oracle_api_key,
    })
}
