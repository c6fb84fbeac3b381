//! Pure decision functions. No IO, no clock: `now` is always passed in.

use tk_config::Thresholds;
use tk_schemas::{ChainLineup, ControlEvent, HandRecord, NettingStatus};

/// What to do about an outstanding netting request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingDecision {
    /// Inside the react delay; receipts may still be in flight.
    TooEarly { age_secs: i64 },
    /// Dispute window open and past the react delay.
    HandleDispute { age_secs: i64 },
    /// Dispute window closed, still inside the settlement grace window.
    ProgressNetting { age_secs: i64 },
    /// Grace window lapsed without a submitted settlement.
    Lapsed { age_secs: i64 },
}

impl PendingDecision {
    pub fn age_secs(&self) -> i64 {
        match *self {
            PendingDecision::TooEarly { age_secs }
            | PendingDecision::HandleDispute { age_secs }
            | PendingDecision::ProgressNetting { age_secs }
            | PendingDecision::Lapsed { age_secs } => age_secs,
        }
    }

    /// Control event to publish, if any.
    pub fn event(&self, table_addr: &str, status: &NettingStatus) -> Option<ControlEvent> {
        match self {
            PendingDecision::HandleDispute { .. } => Some(ControlEvent::HandleDispute {
                table_addr: table_addr.to_string(),
                last_hand_netted: status.last_hand_netted,
                last_netting_request_hand_id: status.last_netting_request_hand_id,
            }),
            PendingDecision::ProgressNetting { .. } => Some(ControlEvent::ProgressNetting {
                table_addr: table_addr.to_string(),
            }),
            PendingDecision::TooEarly { .. } | PendingDecision::Lapsed { .. } => None,
        }
    }
}

/// Classify a pending netting request by its age.
///
/// Boundaries: `age >= window` closes the dispute window, `age >= grace`
/// lapses it, and `age > react` (strict) is needed before disputing.
pub fn decide_pending(status: &NettingStatus, now: i64, t: &Thresholds) -> PendingDecision {
    let age_secs = status.request_age_secs(now);

    if age_secs >= t.dispute_window_secs {
        if age_secs < t.settlement_grace_secs {
            PendingDecision::ProgressNetting { age_secs }
        } else {
            PendingDecision::Lapsed { age_secs }
        }
    } else if age_secs > t.dispute_react_after_secs {
        PendingDecision::HandleDispute { age_secs }
    } else {
        PendingDecision::TooEarly { age_secs }
    }
}

/// Decisions for a table with no outstanding netting request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettledDecision {
    /// Seat positions to evict, in lineup order.
    pub kick: Vec<usize>,
    pub timeout: bool,
    /// Hand id to open a netting request for.
    pub netting_request: Option<u64>,
}

impl SettledDecision {
    pub fn is_noop(&self) -> bool {
        self.kick.is_empty() && !self.timeout && self.netting_request.is_none()
    }

    /// Events in publish order: kicks, then timeout, then netting request.
    pub fn events(&self, table_addr: &str) -> Vec<ControlEvent> {
        let mut out: Vec<ControlEvent> = self
            .kick
            .iter()
            .map(|&pos| ControlEvent::Kick {
                table_addr: table_addr.to_string(),
                pos,
            })
            .collect();

        if self.timeout {
            out.push(ControlEvent::Timeout {
                table_addr: table_addr.to_string(),
            });
        }
        if let Some(hand_id) = self.netting_request {
            out.push(ControlEvent::TableNettingRequest {
                table_addr: table_addr.to_string(),
                hand_id,
            });
        }
        out
    }
}

pub fn decide_settled(
    status: &NettingStatus,
    hand: &HandRecord,
    chain_lineup: &ChainLineup,
    now: i64,
    t: &Thresholds,
) -> SettledDecision {
    let old = now - t.kick_after_secs;
    let too_old = now - t.hand_stale_after_secs;
    let recent = hand.changed > too_old;

    let kick = hand
        .lineup
        .iter()
        .enumerate()
        .filter(|(_, seat)| seat.sat_out_before(old))
        .map(|(pos, _)| pos)
        .collect();

    let timeout = recent && hand.has_player();

    let netting_request = if recent && chain_lineup.any_exit_request() {
        Some(status.last_hand_netted + 1)
    } else {
        None
    };

    SettledDecision {
        kick,
        timeout,
        netting_request,
    }
}
