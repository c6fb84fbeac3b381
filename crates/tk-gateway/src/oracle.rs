use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tk_config::OracleSection;
use tk_schemas::{HandRecord, HandState, Seat};
use tk_stream::{GameOracle, OracleError};

use crate::{build_http, join_url, API_KEY_HEADER};

/// Game-rules service client.
///
/// A `422` means the oracle could not evaluate the snapshot and maps to
/// [`OracleError::Malformed`]; any other failure is [`OracleError::Unavailable`].
#[derive(Debug, Clone)]
pub struct HttpGameOracle {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct CompleteRequest<'a> {
    lineup: &'a [Seat],
    dealer: usize,
    state: HandState,
}

#[derive(Deserialize)]
struct CompleteResponse {
    complete: bool,
}

#[derive(Serialize)]
struct ActiveRequest<'a> {
    lineup: &'a [Seat],
    state: HandState,
}

#[derive(Deserialize)]
struct ActiveResponse {
    active: usize,
}

impl HttpGameOracle {
    pub fn new(cfg: &OracleSection, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            http: build_http(cfg.timeout_secs)?,
            base_url: cfg.base_url.clone(),
            api_key,
        })
    }

    pub fn new_with_base_url(base_url: String) -> Result<Self> {
        let cfg = OracleSection {
            base_url,
            ..OracleSection::default()
        };
        Self::new(&cfg, None)
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<T, OracleError> {
        let mut req = self.http.post(join_url(&self.base_url, path)).json(body);
        if let Some(key) = self.api_key.as_deref() {
            req = req.header(API_KEY_HEADER, key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(format!("oracle request failed: {e}")))?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Malformed(body.trim().to_string()));
        }
        if !status.is_success() {
            return Err(OracleError::Unavailable(format!("oracle http status={}", status.as_u16())));
        }
        resp.json::<T>()
            .await
            .map_err(|e| OracleError::Unavailable(format!("oracle response json decode failed: {e}")))
    }
}

#[async_trait]
impl GameOracle for HttpGameOracle {
    async fn is_hand_complete(
        &self,
        lineup: &[Seat],
        dealer: usize,
        state: HandState,
    ) -> std::result::Result<bool, OracleError> {
        let req = CompleteRequest { lineup, dealer, state };
        self.post::<_, CompleteResponse>("hand/complete", &req)
            .await
            .map(|r| r.complete)
    }

    async fn count_active_players(
        &self,
        lineup: &[Seat],
        state: HandState,
    ) -> std::result::Result<usize, OracleError> {
        let req = ActiveRequest { lineup, state };
        self.post::<_, ActiveResponse>("hand/active", &req)
            .await
            .map(|r| r.active)
    }

    async fn render(&self, hand: &HandRecord) -> std::result::Result<Value, OracleError> {
        self.post::<_, Value>("render", hand).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn lineup() -> Vec<Seat> {
        vec![Seat::new("0xaa", 500), Seat::new("0xbb", 700)]
    }

    #[tokio::test]
    async fn completion_query_sends_lineup_dealer_and_state() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(POST).path("/hand/complete").json_body(json!({
                    "lineup": [
                        { "address": "0xaa", "amount": 500 },
                        { "address": "0xbb", "amount": 700 }
                    ],
                    "dealer": 1,
                    "state": "showdown"
                }));
                then.status(200).json_body(json!({ "complete": true }));
            })
            .await;

        let oracle = HttpGameOracle::new_with_base_url(server.base_url()).unwrap();
        let done = oracle
            .is_hand_complete(&lineup(), 1, HandState::Showdown)
            .await
            .unwrap();

        m.assert_async().await;
        assert!(done);
    }

    #[tokio::test]
    async fn unprocessable_snapshot_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/hand/complete");
                then.status(422).body("receipt chain broken at seat 1");
            })
            .await;

        let oracle = HttpGameOracle::new_with_base_url(server.base_url()).unwrap();
        let err = oracle
            .is_hand_complete(&lineup(), 0, HandState::River)
            .await
            .unwrap_err();

        assert_eq!(err, OracleError::Malformed("receipt chain broken at seat 1".to_string()));
    }

    #[tokio::test]
    async fn active_count_and_render() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/hand/active");
                then.status(200).json_body(json!({ "active": 2 }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/render");
                then.status(200).json_body(json!({ "handId": 9, "pot": 150 }));
            })
            .await;

        let oracle = HttpGameOracle::new_with_base_url(server.base_url()).unwrap();
        assert_eq!(oracle.count_active_players(&lineup(), HandState::Flop).await.unwrap(), 2);

        let hand = HandRecord::new("0xtable", 9, HandState::Flop, 1_700_000_000).with_lineup(lineup());
        let payload = oracle.render(&hand).await.unwrap();
        assert_eq!(payload["pot"], 150);
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/render");
                then.status(503);
            })
            .await;

        let oracle = HttpGameOracle::new_with_base_url(server.base_url()).unwrap();
        let hand = HandRecord::new("0xtable", 9, HandState::Flop, 1_700_000_000);
        assert!(matches!(oracle.render(&hand).await, Err(OracleError::Unavailable(_))));
    }
}
