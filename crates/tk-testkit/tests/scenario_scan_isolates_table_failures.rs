//! Scenario: one scan pass over several tables.
//!
//! # Invariants under test
//!
//! 1. Every registered table gets one line in the report.
//! 2. A chain failure on one table is reported and does not stop the others.
//! 3. A store failure on a settled table is reported the same way.
//! 4. A registry failure fails the whole pass.

use std::sync::Arc;

use tk_config::Thresholds;
use tk_reconcile::{ReconcileError, Reconciler, TableOutcome};
use tk_schemas::{HandState, Subject};
use tk_testkit::{player, FakeChain, InMemoryHandStore, RecordingPublisher, NOW};

const PENDING: &str = "0x0000000000000000000000000000000000000001";
const BROKEN: &str = "0x0000000000000000000000000000000000000002";
const STUCK: &str = "0x0000000000000000000000000000000000000003";
const STORE_DOWN: &str = "0x0000000000000000000000000000000000000004";

fn build() -> (Arc<FakeChain>, Arc<InMemoryHandStore>, Arc<RecordingPublisher>, Reconciler) {
    let chain = Arc::new(FakeChain::new());
    chain.set_status(PENDING, 100, 105, NOW - 700);
    chain.set_status(BROKEN, 0, 0, 0);
    chain.fail_table(BROKEN);
    chain.set_status(STUCK, 7, 7, NOW - 9_000);
    chain.set_status(STORE_DOWN, 3, 3, NOW - 9_000);

    let store = Arc::new(InMemoryHandStore::new());
    store.put(
        tk_schemas::HandRecord::new(STUCK, 8, HandState::River, NOW - 45)
            .with_lineup(vec![player(1, 100), player(2, 100)]),
    );
    store.fail_table(STORE_DOWN);

    let bus = Arc::new(RecordingPublisher::new());
    let reconciler = Reconciler::new(
        chain.clone(),
        chain.clone(),
        store.clone(),
        bus.clone(),
        Thresholds::default(),
    );
    (chain, store, bus, reconciler)
}

#[tokio::test]
async fn failing_tables_do_not_abort_siblings() {
    let (_chain, _store, bus, reconciler) = build();

    let report = reconciler.scan_at(NOW).await.unwrap();

    assert_eq!(report.tables.len(), 4);
    assert_eq!(report.error_count(), 2);
    assert_eq!(report.published_count(), 2);

    let pending = report.get(PENDING).unwrap();
    assert_eq!(pending.outcome, Some(TableOutcome::ProgressNetting { age_secs: 700 }));

    let broken = report.get(BROKEN).unwrap();
    assert!(broken.outcome.is_none());
    assert!(broken.error.as_deref().unwrap().contains("execution reverted"));

    let store_down = report.get(STORE_DOWN).unwrap();
    assert!(store_down.error.as_deref().unwrap().contains("store read failed"));

    let mut subjects = bus.subjects();
    subjects.sort();
    assert_eq!(subjects, vec![Subject::ProgressNetting, Subject::Timeout]);
}

#[tokio::test]
async fn registry_failure_fails_the_pass() {
    let (chain, _store, bus, reconciler) = build();
    chain.take_registry_down();

    let err = reconciler.scan_at(NOW).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Read(_)));
    assert!(bus.events().is_empty());
}

#[tokio::test]
async fn report_serializes_outcome_tags() {
    let (_chain, _store, _bus, reconciler) = build();

    let report = reconciler.scan_at(NOW).await.unwrap();
    let v = serde_json::to_value(&report).unwrap();

    let tables = v["tables"].as_array().unwrap();
    let pending = tables
        .iter()
        .find(|t| t["table_addr"] == PENDING)
        .unwrap();
    assert_eq!(pending["outcome"]["outcome"], "progress_netting");
    assert_eq!(pending["published"][0]["subject"], "ProgressNetting");
}
