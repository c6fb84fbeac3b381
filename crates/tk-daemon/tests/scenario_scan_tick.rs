//! Scenario: background scan tick.
//!
//! 1. The tick runs reconciliation passes on its own and records them in status.
//! 2. A failing registry is counted, surfaced as an ERROR log line, and does
//!    not stop later ticks.

use std::{sync::Arc, time::Duration};

use tk_bus::{BroadcastBus, BusMsg};
use tk_config::Thresholds;
use tk_daemon::state::{self, AppState};
use tk_reconcile::Reconciler;
use tk_schemas::Subject;
use tk_stream::HandStreamReactor;
use tk_testkit::{FakeChain, InMemoryHandStore, RecordingPublisher, ScriptedOracle, TABLE};

fn app(chain: Arc<FakeChain>, recorded: Arc<RecordingPublisher>) -> Arc<AppState> {
    let reconciler = Reconciler::new(
        chain.clone(),
        chain,
        Arc::new(InMemoryHandStore::new()),
        recorded.clone(),
        Thresholds::default(),
    );
    let reactor = HandStreamReactor::new(Arc::new(ScriptedOracle::new()), recorded);
    Arc::new(AppState::new(BroadcastBus::new(64), reconciler, reactor, None))
}

#[tokio::test]
async fn tick_runs_passes_and_records_them() {
    let chain = Arc::new(FakeChain::new());
    chain.set_status(TABLE, 100, 105, chrono::Utc::now().timestamp() - 300);
    let recorded = Arc::new(RecordingPublisher::new());
    let st = app(chain, recorded.clone());

    state::spawn_scan_tick(Arc::clone(&st), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let s = st.status.read().await;
    assert!(s.scans_completed >= 2, "expected several passes, got {}", s.scans_completed);
    assert_eq!(s.scans_failed, 0);
    assert_eq!(s.last_scan.as_ref().map(|l| l.tables), Some(1));
    drop(s);

    let subjects = recorded.subjects();
    assert!(!subjects.is_empty());
    assert!(subjects.iter().all(|s| *s == Subject::HandleDispute));
}

#[tokio::test]
async fn failing_registry_is_counted_and_logged() {
    let chain = Arc::new(FakeChain::new());
    chain.take_registry_down();
    let st = app(chain, Arc::new(RecordingPublisher::new()));
    let mut rx = st.bus.subscribe();

    state::spawn_scan_tick(Arc::clone(&st), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let s = st.status.read().await;
    assert_eq!(s.scans_completed, 0);
    assert!(s.scans_failed >= 2);
    assert!(s.last_error.as_deref().unwrap().contains("registry"));
    drop(s);

    match rx.try_recv().expect("log line expected") {
        BusMsg::LogLine { level, .. } => assert_eq!(level, "ERROR"),
        other => panic!("unexpected bus message {other:?}"),
    }
}
