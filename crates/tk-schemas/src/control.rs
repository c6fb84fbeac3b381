use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::NettingRecord;

/// Bus subject, one per control decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subject {
    ProgressNetting,
    HandleDispute,
    Kick,
    Timeout,
    TableNettingRequest,
    TableLeave,
    HandComplete,
    TableNettingComplete,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::ProgressNetting => "ProgressNetting",
            Subject::HandleDispute => "HandleDispute",
            Subject::Kick => "Kick",
            Subject::Timeout => "Timeout",
            Subject::TableNettingRequest => "TableNettingRequest",
            Subject::TableLeave => "TableLeave",
            Subject::HandComplete => "HandComplete",
            Subject::TableNettingComplete => "TableNettingComplete",
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A control decision taken by the reconciler or the stream reactor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "subject")]
pub enum ControlEvent {
    /// Submit the accumulated settlement to the contract.
    #[serde(rename_all = "camelCase")]
    ProgressNetting { table_addr: String },

    /// Submit held dispute receipts before the dispute window closes.
    #[serde(rename_all = "camelCase")]
    HandleDispute {
        table_addr: String,
        last_hand_netted: u64,
        last_netting_request_hand_id: u64,
    },

    /// Evict the seat at `pos`.
    #[serde(rename_all = "camelCase")]
    Kick { table_addr: String, pos: usize },

    /// Force the current hand to resolve.
    #[serde(rename_all = "camelCase")]
    Timeout { table_addr: String },

    /// Start accumulating a settlement for `hand_id`.
    #[serde(rename_all = "camelCase")]
    TableNettingRequest { table_addr: String, hand_id: u64 },

    #[serde(rename_all = "camelCase")]
    TableLeave {
        table_addr: String,
        leaver_addr: String,
        exit_hand: u64,
    },

    #[serde(rename_all = "camelCase")]
    HandComplete { table_addr: String, hand_id: u64 },

    /// Every active seat has signed; the final settlement can be submitted.
    #[serde(rename_all = "camelCase")]
    TableNettingComplete {
        table_addr: String,
        hand_id: u64,
        netting: NettingRecord,
    },
}

impl ControlEvent {
    pub fn subject(&self) -> Subject {
        match self {
            ControlEvent::ProgressNetting { .. } => Subject::ProgressNetting,
            ControlEvent::HandleDispute { .. } => Subject::HandleDispute,
            ControlEvent::Kick { .. } => Subject::Kick,
            ControlEvent::Timeout { .. } => Subject::Timeout,
            ControlEvent::TableNettingRequest { .. } => Subject::TableNettingRequest,
            ControlEvent::TableLeave { .. } => Subject::TableLeave,
            ControlEvent::HandComplete { .. } => Subject::HandComplete,
            ControlEvent::TableNettingComplete { .. } => Subject::TableNettingComplete,
        }
    }

    pub fn table_addr(&self) -> &str {
        match self {
            ControlEvent::ProgressNetting { table_addr }
            | ControlEvent::HandleDispute { table_addr, .. }
            | ControlEvent::Kick { table_addr, .. }
            | ControlEvent::Timeout { table_addr }
            | ControlEvent::TableNettingRequest { table_addr, .. }
            | ControlEvent::TableLeave { table_addr, .. }
            | ControlEvent::HandComplete { table_addr, .. }
            | ControlEvent::TableNettingComplete { table_addr, .. } => table_addr,
        }
    }

    /// Subject-specific payload, without the subject and table address.
    pub fn payload(&self) -> Value {
        match self {
            ControlEvent::ProgressNetting { .. } | ControlEvent::Timeout { .. } => json!({}),
            ControlEvent::HandleDispute {
                last_hand_netted,
                last_netting_request_hand_id,
                ..
            } => json!({
                "lastHandNetted": last_hand_netted,
                "lastNettingRequestHandId": last_netting_request_hand_id,
            }),
            ControlEvent::Kick { pos, .. } => json!({ "pos": pos }),
            ControlEvent::TableNettingRequest { hand_id, .. }
            | ControlEvent::HandComplete { hand_id, .. } => json!({ "handId": hand_id }),
            ControlEvent::TableLeave {
                leaver_addr,
                exit_hand,
                ..
            } => json!({ "leaverAddr": leaver_addr, "exitHand": exit_hand }),
            ControlEvent::TableNettingComplete {
                hand_id, netting, ..
            } => json!({
                "handId": hand_id,
                "netting": Value::Object(netting.clone().into()),
            }),
        }
    }
}

/// What actually travels on the bus: the decision plus delivery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlEnvelope {
    pub event_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub subject: Subject,
    pub table_addr: String,
    pub payload: Value,
}

impl ControlEnvelope {
    pub fn wrap(event: &ControlEvent, ts_utc: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            ts_utc,
            subject: event.subject(),
            table_addr: event.table_addr().to_string(),
            payload: event.payload(),
        }
    }

    /// Rebuild the decision this envelope carries.
    pub fn event(&self) -> Result<ControlEvent, serde_json::Error> {
        let mut fields = match &self.payload {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        fields.insert("subject".to_string(), json!(self.subject));
        fields.insert("tableAddr".to_string(), json!(self.table_addr));
        serde_json::from_value(Value::Object(fields))
    }
}

/// Rendered UI payload for one table, published on the live-update channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveUpdate {
    pub table_addr: String,
    pub hand_id: u64,
    pub payload: Value,
}
