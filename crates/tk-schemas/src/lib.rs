//! tk-schemas
//!
//! Shared data model for the escrow/hand reconciliation workspace.
//!
//! - [`chain`]: what the escrow contract reports about a table.
//! - [`hand`]: the off-chain hand record and its seats.
//! - [`netting`]: the settlement signature record carried by a hand.
//! - [`control`]: control events published on the notification bus.
//! - [`change`]: hand-record mutation events consumed by the stream reactor.
//!
//! Plain data only. No IO, no clock.

pub mod change;
pub mod chain;
pub mod control;
pub mod hand;
pub mod netting;

pub use change::{ChangeKind, HandChange};
pub use chain::{ChainLineup, ChainSeat, NettingStatus};
pub use control::{ControlEnvelope, ControlEvent, LiveUpdate, Subject};
pub use hand::{HandRecord, HandState, Seat, EMPTY_SEAT};
pub use netting::{NettingRecord, NettingWireError, FINAL_BALANCES_KEY, ORACLE_SIGNATURE_KEY};
