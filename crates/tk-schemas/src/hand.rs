use serde::{Deserialize, Serialize};

use crate::NettingRecord;

/// Address used by the store for a seat nobody occupies.
pub const EMPTY_SEAT: &str = "0x0000000000000000000000000000000000000000";

/// Betting state of a hand as written by the gameplay engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandState {
    Waiting,
    Dealing,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl HandState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandState::Waiting => "waiting",
            HandState::Dealing => "dealing",
            HandState::Preflop => "preflop",
            HandState::Flop => "flop",
            HandState::Turn => "turn",
            HandState::River => "river",
            HandState::Showdown => "showdown",
        }
    }
}

/// One off-chain seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub address: String,
    #[serde(default)]
    pub amount: u64,
    /// Unix seconds at which the seat went inactive. Absent = active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sitout: Option<i64>,
    /// Hand id at which the seat is scheduled to leave. `Some(0)` means no
    /// request, same as on chain; read it through [`Seat::exit_request`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_hand: Option<u64>,
    /// The seat's most recent signed action receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

impl Seat {
    pub fn new(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: address.into(),
            amount,
            sitout: None,
            exit_hand: None,
            last: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(EMPTY_SEAT, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.address.is_empty() || self.address == EMPTY_SEAT
    }

    /// `true` when the seat has been inactive since strictly before `cutoff`.
    pub fn sat_out_before(&self, cutoff: i64) -> bool {
        matches!(self.sitout, Some(ts) if ts < cutoff)
    }

    /// The scheduled exit hand, if the seat has asked to leave.
    pub fn exit_request(&self) -> Option<u64> {
        self.exit_hand.filter(|&h| h > 0)
    }

    /// `true` when the seat leaves at or before `hand_id`.
    pub fn leaves_by(&self, hand_id: u64) -> bool {
        matches!(self.exit_request(), Some(h) if h <= hand_id)
    }
}

/// Off-chain snapshot of one table + hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandRecord {
    pub table_addr: String,
    pub hand_id: u64,
    pub state: HandState,
    #[serde(default)]
    pub dealer: usize,
    #[serde(default)]
    pub sb: u64,
    #[serde(default)]
    pub lineup: Vec<Seat>,
    /// Unix seconds of the last mutation. Strictly increasing per record.
    pub changed: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_max_bet: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flop_max_bet: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_max_bet: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub river_max_bet: Option<u64>,
    /// Payout result once computed by the rules engine. Opaque here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<serde_json::Value>,
    /// Present only once settlement has begun.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netting: Option<NettingRecord>,
}

impl HandRecord {
    pub fn new(table_addr: impl Into<String>, hand_id: u64, state: HandState, changed: i64) -> Self {
        Self {
            table_addr: table_addr.into(),
            hand_id,
            state,
            dealer: 0,
            sb: 0,
            lineup: Vec::new(),
            changed,
            started: None,
            deck: None,
            pre_max_bet: None,
            flop_max_bet: None,
            turn_max_bet: None,
            river_max_bet: None,
            distribution: None,
            netting: None,
        }
    }

    pub fn with_lineup(mut self, lineup: Vec<Seat>) -> Self {
        self.lineup = lineup;
        self
    }

    /// At least one seat is occupied.
    pub fn has_player(&self) -> bool {
        self.lineup.iter().any(|s| !s.is_empty())
    }

    /// Some seat is scheduled to leave at or before this hand.
    pub fn has_pending_leave(&self) -> bool {
        self.lineup.iter().any(|s| s.leaves_by(self.hand_id))
    }
}
