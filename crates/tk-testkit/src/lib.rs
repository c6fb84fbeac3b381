//! In-memory collaborators for scenario tests.
//!
//! Deterministic, no network, no clock. Each fake can be told to fail for a
//! given table so error isolation can be exercised.

mod chain;
mod oracle;
mod publisher;
mod store;

pub use chain::FakeChain;
pub use oracle::ScriptedOracle;
pub use publisher::RecordingPublisher;
pub use store::InMemoryHandStore;

use tk_schemas::{HandRecord, HandState, Seat};

/// Fixed "now" used across scenarios.
pub const NOW: i64 = 1_700_000_000;

pub const TABLE: &str = "0x00000000000000000000000000000000000000aa";

/// Occupied seat with a deterministic address derived from `n`.
pub fn player(n: u8, amount: u64) -> Seat {
    Seat::new(format!("0x{:040x}", n), amount)
}

/// Hand on [`TABLE`] with the given lineup.
pub fn hand(hand_id: u64, state: HandState, changed: i64, lineup: Vec<Seat>) -> HandRecord {
    HandRecord::new(TABLE, hand_id, state, changed).with_lineup(lineup)
}
