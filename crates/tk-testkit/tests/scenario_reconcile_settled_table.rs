//! Scenario: settled tables (`lnr <= lhn`).
//!
//! # Invariants under test
//!
//! 1. No off-chain hand => nothing published, outcome `NoHand`.
//! 2. `sitout = now-301` kicks; `sitout = now-299` does not.
//! 3. A recent hand with a player times out; an old one does not.
//! 4. An on-chain exit request opens netting for `lhn + 1`.
//! 5. Two immediate passes over unchanged state decide identically.

use std::sync::Arc;

use tk_config::Thresholds;
use tk_reconcile::{Reconciler, TableOutcome};
use tk_schemas::{ChainSeat, ControlEvent, HandState, NettingStatus, Seat, Subject};
use tk_testkit::{hand, player, FakeChain, InMemoryHandStore, RecordingPublisher, NOW, TABLE};

struct Rig {
    chain: Arc<FakeChain>,
    store: Arc<InMemoryHandStore>,
    bus: Arc<RecordingPublisher>,
    reconciler: Reconciler,
}

fn settled_status() -> NettingStatus {
    NettingStatus {
        last_hand_netted: 100,
        last_netting_request_hand_id: 100,
        last_netting_request_time: NOW - 86_400,
    }
}

fn rig(chain_seats: Vec<ChainSeat>) -> Rig {
    let chain = Arc::new(FakeChain::new());
    chain.set_table(TABLE, settled_status(), chain_seats);
    let store = Arc::new(InMemoryHandStore::new());
    let bus = Arc::new(RecordingPublisher::new());
    let reconciler = Reconciler::new(
        chain.clone(),
        chain.clone(),
        store.clone(),
        bus.clone(),
        Thresholds::default(),
    );
    Rig {
        chain,
        store,
        bus,
        reconciler,
    }
}

fn sitting_out(n: u8, since: i64) -> Seat {
    let mut s = player(n, 1_000);
    s.sitout = Some(since);
    s
}

#[tokio::test]
async fn no_hand_means_nothing_to_do() {
    let r = rig(vec![ChainSeat::new("0xaa", 500, 101)]);

    let out = r.reconciler.reconcile_table_at(TABLE, NOW).await.unwrap();

    assert_eq!(out.outcome, TableOutcome::NoHand);
    assert!(r.bus.events().is_empty());
}

#[tokio::test]
async fn kick_threshold_is_strict() {
    let r = rig(vec![]);
    // Hand is older than the stale cutoff so only kicks can fire.
    r.store.put(hand(
        101,
        HandState::Flop,
        NOW - 4_000,
        vec![sitting_out(1, NOW - 299), sitting_out(2, NOW - 301), player(3, 900)],
    ));

    let out = r.reconciler.reconcile_table_at(TABLE, NOW).await.unwrap();

    assert_eq!(
        r.bus.events(),
        vec![ControlEvent::Kick {
            table_addr: TABLE.to_string(),
            pos: 1
        }]
    );
    match out.outcome {
        TableOutcome::Settled { kicked, timeout, .. } => {
            assert_eq!(kicked, vec![1]);
            assert!(!timeout);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn recent_hand_with_player_times_out() {
    let r = rig(vec![]);
    r.store.put(hand(101, HandState::Turn, NOW - 90, vec![player(1, 500), Seat::empty()]));

    r.reconciler.reconcile_table_at(TABLE, NOW).await.unwrap();
    assert_eq!(r.bus.subjects(), vec![Subject::Timeout]);
}

#[tokio::test]
async fn exit_request_opens_netting_for_next_hand() {
    let r = rig(vec![ChainSeat::new("0xaa", 500, 0), ChainSeat::new("0xbb", 700, 101)]);
    r.store.put(hand(101, HandState::Waiting, NOW - 30, vec![player(1, 500), player(2, 700)]));

    let out = r.reconciler.reconcile_table_at(TABLE, NOW).await.unwrap();

    assert_eq!(
        out.published,
        vec![
            ControlEvent::Timeout {
                table_addr: TABLE.to_string()
            },
            ControlEvent::TableNettingRequest {
                table_addr: TABLE.to_string(),
                hand_id: 101
            },
        ]
    );
    assert_eq!(r.bus.events(), out.published);
}

#[tokio::test]
async fn repeated_pass_is_idempotent() {
    let r = rig(vec![ChainSeat::new("0xbb", 700, 101)]);
    r.store.put(hand(
        101,
        HandState::Preflop,
        NOW - 30,
        vec![sitting_out(1, NOW - 1_000), player(2, 700)],
    ));

    let first = r.reconciler.reconcile_table_at(TABLE, NOW).await.unwrap();
    let published_once = r.bus.events();
    let second = r.reconciler.reconcile_table_at(TABLE, NOW).await.unwrap();

    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.published, second.published);
    assert_eq!(r.bus.events().len(), published_once.len() * 2);
    assert!(r.chain.reads() >= 8);
}
