use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use tk_config::GatewaySection;
use tk_reconcile::{ChainReader, ReadError, TableRegistry};
use tk_schemas::ChainLineup;

use crate::{build_http, join_url, API_KEY_HEADER};

/// Escrow gateway client.
///
/// Routes:
/// - `GET /tables` -> `{"tables": [addr, ..]}`
/// - `GET /tables/{addr}/{call}` -> `{"value": n}` for the netting counters
/// - `GET /tables/{addr}/lineup` -> `{"lastHandNetted": n, "seats": [..]}`
#[derive(Debug, Clone)]
pub struct HttpEscrowGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TablesResponse {
    tables: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ValueResponse<T> {
    value: T,
}

impl HttpEscrowGateway {
    pub fn new(cfg: &GatewaySection, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            http: build_http(cfg.timeout_secs)?,
            base_url: cfg.base_url.clone(),
            api_key,
        })
    }

    pub fn new_with_base_url(base_url: String) -> Result<Self> {
        let cfg = GatewaySection {
            base_url,
            ..GatewaySection::default()
        };
        Self::new(&cfg, None)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, String> {
        let url = join_url(&self.base_url, path);
        debug!(%url, "escrow gateway read");

        let mut req = self.http.get(&url);
        if let Some(key) = self.api_key.as_deref() {
            req = req.header(API_KEY_HEADER, key);
        }

        let resp = req.send().await.map_err(|e| format!("request failed: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("http status={} body={}", status.as_u16(), body.trim()));
        }
        resp.json::<T>()
            .await
            .map_err(|e| format!("response json decode failed: {e}"))
    }

    async fn counter<T: DeserializeOwned>(&self, table_addr: &str, call: &'static str) -> std::result::Result<T, ReadError> {
        self.get_json::<ValueResponse<T>>(&format!("tables/{table_addr}/{call}"))
            .await
            .map(|r| r.value)
            .map_err(|reason| ReadError::chain(table_addr, call, reason))
    }
}

#[async_trait]
impl ChainReader for HttpEscrowGateway {
    async fn last_hand_netted(&self, table_addr: &str) -> std::result::Result<u64, ReadError> {
        self.counter(table_addr, "lastHandNetted").await
    }

    async fn last_netting_request_hand_id(&self, table_addr: &str) -> std::result::Result<u64, ReadError> {
        self.counter(table_addr, "lastNettingRequestHandId").await
    }

    async fn last_netting_request_time(&self, table_addr: &str) -> std::result::Result<i64, ReadError> {
        self.counter(table_addr, "lastNettingRequestTime").await
    }

    async fn lineup(&self, table_addr: &str) -> std::result::Result<ChainLineup, ReadError> {
        self.get_json::<ChainLineup>(&format!("tables/{table_addr}/lineup"))
            .await
            .map_err(|reason| ReadError::chain(table_addr, "getLineup", reason))
    }
}

#[async_trait]
impl TableRegistry for HttpEscrowGateway {
    async fn list_tables(&self) -> std::result::Result<Vec<String>, ReadError> {
        self.get_json::<TablesResponse>("tables")
            .await
            .map(|r| r.tables)
            .map_err(ReadError::Registry)
    }
}
