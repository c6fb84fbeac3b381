//! tk-reconcile
//!
//! Dispute & netting reconciler.
//!
//! For every table the registry knows about, compare the escrow contract's
//! netting counters and lineup against the latest off-chain hand record and
//! publish the control decision that follows:
//!
//! - pending netting request, dispute window closed => `ProgressNetting`
//! - pending netting request, window open past the react delay => `HandleDispute`
//! - settled table => `Kick` stale sitouts, `Timeout` live-but-stuck hands,
//!   `TableNettingRequest` when the contract holds an exit request
//!
//! Every decision is a pure function of current chain + store state
//! ([`decide`]). Nothing is remembered between passes; a failed table is
//! simply re-derived on the next pass.

pub mod decide;
mod ports;
mod reconciler;
mod types;

pub use decide::{decide_pending, decide_settled, PendingDecision, SettledDecision};
pub use ports::{ChainReader, HandStore, ReadError, TableRegistry};
pub use reconciler::Reconciler;
pub use types::{ReconcileError, ScanReport, TableOutcome, TableReconciliation, TableScan};
