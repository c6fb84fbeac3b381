//! tk-stream
//!
//! Hand stream reactor. Consumes one off-chain hand-record mutation at a time
//! and derives control decisions from the before/after delta:
//!
//! - a seat's `exit_hand` becoming set => `TableLeave` (and an immediate
//!   `TableNettingRequest` when the exit targets a finished hand)
//! - the hand turning complete => `HandComplete`, plus `TableNettingRequest`
//!   when a leave is pending and settlement has not started
//! - a new netting signature completing the signer set => `TableNettingComplete`
//!
//! Every call also renders the "after" record for the live-update channel.
//! Game rules are consulted through [`GameOracle`]; an oracle failure counts
//! as "not complete" and never produces a positive detection.

mod oracle;
mod reactor;

pub use oracle::{GameOracle, OracleError};
pub use reactor::{HandStreamReactor, ProcessOutcome, ReactorError};
