//! Axum router and all HTTP handlers for tk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Scenario tests in `tests/` compose the bare router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use tk_bus::BusMsg;
use tk_reconcile::{ReadError, ReconcileError};
use tk_schemas::HandChange;

use crate::{
    api_types::{ErrorResponse, HealthResponse, StreamQuery},
    state::{uptime_secs, AppState},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/scan", post(scan))
        .route("/v1/hands/changes", post(hand_change))
        .route("/v1/stream", get(stream))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let mut snap = st.status.read().await.clone();
    snap.daemon_uptime_secs = uptime_secs();
    (StatusCode::OK, Json(snap))
}

// ---------------------------------------------------------------------------
// POST /v1/scan
// ---------------------------------------------------------------------------

/// Run one reconciliation pass now.
///
/// Per-table failures are part of a `200` report; only a registry or
/// publish-level failure of the whole pass returns `502`.
pub(crate) async fn scan(State(st): State<Arc<AppState>>) -> Response {
    match st.run_scan().await {
        Ok(report) => {
            info!(tables = report.tables.len(), published = report.published_count(), "scan");
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(err) => {
            let kind = match &err {
                ReconcileError::Read(ReadError::Registry(_)) => "registry",
                ReconcileError::Read(_) => "read",
                ReconcileError::Publish(_) => "publish",
            };
            warn!(error = %err, kind, "scan failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: err.to_string(),
                    kind: kind.to_string(),
                }),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/hands/changes
// ---------------------------------------------------------------------------

/// Ingest one hand-record mutation from the store's change stream.
pub(crate) async fn hand_change(State(st): State<Arc<AppState>>, Json(change): Json<HandChange>) -> Response {
    match st.process_change(&change).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => {
            warn!(table = %change.table_addr, hand_id = change.hand_id, error = %err, "change processing failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: err.to_string(),
                    kind: "publish".to_string(),
                }),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>, Query(q): Query<StreamQuery>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx, q.table);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

/// Untargeted messages (heartbeats, log lines) pass every filter.
pub fn visible_to(msg: &BusMsg, table: Option<&str>) -> bool {
    match (table, msg.table_addr()) {
        (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
        _ => true,
    }
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
    table: Option<String>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(move |msg| {
        let table = table.clone();
        async move {
            match msg {
                Ok(m) if visible_to(&m, table.as_deref()) => {
                    let data = serde_json::to_string(&m).ok()?;
                    Some(Ok(Event::default().event(m.event_name()).data(data)))
                }
                Ok(_) => None,
                Err(_) => None, // lagged / closed
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tk_schemas::LiveUpdate;

    #[test]
    fn table_filter_keeps_untargeted_messages() {
        let live = BusMsg::Live(LiveUpdate {
            table_addr: "0xAA".to_string(),
            hand_id: 1,
            payload: serde_json::json!({}),
        });
        let hb = BusMsg::Heartbeat { ts_millis: 1 };

        assert!(visible_to(&live, None));
        assert!(visible_to(&live, Some("0xaa")));
        assert!(!visible_to(&live, Some("0xbb")));
        assert!(visible_to(&hb, Some("0xbb")));
    }
}
