//! tk-config
//!
//! Layered YAML configuration for the keeper processes.
//!
//! - YAML documents merge in order (later overrides earlier), then the merged
//!   document is canonicalised and hashed so every process can log exactly
//!   which configuration it is running ([`layers`]).
//! - Literal secrets are refused; config stores env var NAMES only
//!   (see [`secrets`]).
//! - [`KeeperConfig`] is the typed view the binaries consume. Keys it does not
//!   know, or that belong to a section the reading process ignores, are
//!   reported by [`report_unused_keys`].

pub mod keeper;
pub mod layers;
pub mod secrets;
pub mod thresholds;
mod unused;

pub use keeper::{
    BusSection, DaemonSection, DbSection, GatewaySection, KeeperConfig, OracleSection,
    ReconcileSection,
};
pub use layers::{load_layered_yaml, load_layered_yaml_from_strings, LoadedConfig};
pub use secrets::{resolve_secrets, ResolvedSecrets};
pub use thresholds::Thresholds;
pub use unused::{report_unused_keys, UnusedKeyPolicy, UnusedKeyReport};

/// Which process is reading the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    Daemon,
    Cli,
}

impl ProcessRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessRole::Daemon => "DAEMON",
            ProcessRole::Cli => "CLI",
        }
    }

    /// Whether this role reads the given top-level [`KeeperConfig`] section.
    /// The CLI runs one pass and exits: it has no bus and binds no port.
    pub fn reads_section(&self, section: &str) -> bool {
        match self {
            ProcessRole::Daemon => true,
            ProcessRole::Cli => !matches!(section, "bus" | "daemon"),
        }
    }
}
