//! tk-gateway
//!
//! HTTP clients for the two external collaborators:
//!
//! - [`HttpEscrowGateway`]: table registry and escrow contract reads, served by
//!   a JSON gateway in front of the chain node.
//! - [`HttpGameOracle`]: the game-rules service (completion, active seats,
//!   live-update rendering).
//!
//! Clients are built once per process and shared; they hold connection pools
//! only. API keys are passed in by the caller and never logged.

mod escrow;
mod oracle;

pub use escrow::HttpEscrowGateway;
pub use oracle::HttpGameOracle;

use std::time::Duration;

use anyhow::{Context, Result};

const API_KEY_HEADER: &str = "x-api-key";

fn build_http(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .context("http client build failed")
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("http://h:1/", "/tables"), "http://h:1/tables");
        assert_eq!(join_url("http://h:1", "tables/0xaa/lineup"), "http://h:1/tables/0xaa/lineup");
    }
}
