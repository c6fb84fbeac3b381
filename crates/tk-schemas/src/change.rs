use serde::{Deserialize, Serialize};

use crate::HandRecord;

/// Kind of store mutation.
///
/// Kinds the reactor does not handle deserialize as [`ChangeKind::Unknown`]
/// instead of failing the whole event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
    #[serde(other)]
    Unknown,
}

/// One hand-record mutation as delivered by the store's change stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandChange {
    pub kind: ChangeKind,
    pub table_addr: String,
    pub hand_id: u64,
    /// Empty for `INSERT`.
    #[serde(default)]
    pub before: Option<HandRecord>,
    #[serde(default)]
    pub after: Option<HandRecord>,
}

impl HandChange {
    pub fn insert(after: HandRecord) -> Self {
        Self {
            kind: ChangeKind::Insert,
            table_addr: after.table_addr.clone(),
            hand_id: after.hand_id,
            before: None,
            after: Some(after),
        }
    }

    pub fn modify(before: HandRecord, after: HandRecord) -> Self {
        Self {
            kind: ChangeKind::Modify,
            table_addr: after.table_addr.clone(),
            hand_id: after.hand_id,
            before: Some(before),
            after: Some(after),
        }
    }
}
