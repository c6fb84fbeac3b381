//! Shared runtime state for tk-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The only mutable state
//! is the status snapshot; reconciliation decisions are never cached here.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, warn};

use tk_bus::{BroadcastBus, BusMsg};
use tk_reconcile::{ReconcileError, Reconciler, ScanReport};
use tk_schemas::HandChange;
use tk_stream::{HandStreamReactor, ProcessOutcome, ReactorError};

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// StatusSnapshot
// ---------------------------------------------------------------------------

/// Summary of the most recent scan pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub started_at: DateTime<Utc>,
    pub tables: usize,
    pub published: usize,
    pub errors: usize,
    /// Tables whose netting request outlived the grace window.
    pub lapsed: Vec<String>,
}

impl ScanSummary {
    pub fn from_report(report: &ScanReport) -> Self {
        Self {
            started_at: report.started_at,
            tables: report.tables.len(),
            published: report.published_count(),
            errors: report.error_count(),
            lapsed: report.lapsed_tables().map(|t| t.table_addr.clone()).collect(),
        }
    }
}

/// Point-in-time snapshot returned by GET /v1/status.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub daemon_uptime_secs: u64,
    pub config_hash: Option<String>,
    pub scans_completed: u64,
    pub scans_failed: u64,
    pub changes_processed: u64,
    pub changes_failed: u64,
    pub last_scan: Option<ScanSummary>,
    pub last_error: Option<String>,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// In-process bus; SSE subscribers read from it.
    pub bus: BroadcastBus,
    pub build: BuildInfo,
    pub status: Arc<RwLock<StatusSnapshot>>,
    pub reconciler: Reconciler,
    pub reactor: Arc<HandStreamReactor>,
}

impl AppState {
    pub fn new(
        bus: BroadcastBus,
        reconciler: Reconciler,
        reactor: HandStreamReactor,
        config_hash: Option<String>,
    ) -> Self {
        let initial_status = StatusSnapshot {
            daemon_uptime_secs: uptime_secs(),
            config_hash,
            ..StatusSnapshot::default()
        };

        Self {
            bus,
            build: BuildInfo {
                service: "tk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            status: Arc::new(RwLock::new(initial_status)),
            reconciler,
            reactor: Arc::new(reactor),
        }
    }

    /// Run one reconciliation pass and fold the result into the status.
    pub async fn run_scan(&self) -> Result<ScanReport, ReconcileError> {
        let res = self.reconciler.scan().await;

        let mut s = self.status.write().await;
        match &res {
            Ok(report) => {
                let summary = ScanSummary::from_report(report);
                for table in &summary.lapsed {
                    self.bus.log_line(
                        "WARN",
                        format!("netting request for table {table} outlived the settlement grace window; manual intervention required"),
                    );
                }
                s.scans_completed += 1;
                s.last_scan = Some(summary);
            }
            Err(err) => {
                s.scans_failed += 1;
                s.last_error = Some(err.to_string());
                self.bus.log_line("ERROR", format!("reconcile scan failed: {err}"));
            }
        }
        res
    }

    /// Feed one store mutation through the reactor.
    pub async fn process_change(&self, change: &HandChange) -> Result<ProcessOutcome, ReactorError> {
        let res = self.reactor.process(change).await;

        let mut s = self.status.write().await;
        match &res {
            Ok(_) => s.changes_processed += 1,
            Err(err) => {
                s.changes_failed += 1;
                s.last_error = Some(err.to_string());
            }
        }
        res
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: BroadcastBus, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = Utc::now().timestamp_millis();
            bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

/// Spawn the periodic reconciliation pass.
///
/// A failed pass is logged and counted; the next tick starts from scratch.
pub fn spawn_scan_tick(state: Arc<AppState>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match state.run_scan().await {
                Ok(report) if report.error_count() > 0 => {
                    warn!(errors = report.error_count(), "scan tick finished with table errors")
                }
                Ok(_) => {}
                Err(err) => error!(error = %err, "scan tick failed"),
            }
        }
    });
}
