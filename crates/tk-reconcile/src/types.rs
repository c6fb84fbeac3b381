use chrono::{DateTime, Utc};
use serde::Serialize;

use tk_bus::PublishError;
use tk_schemas::ControlEvent;

use crate::ReadError;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Which branch one table's reconciliation took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TableOutcome {
    DisputeTooEarly { age_secs: i64 },
    DisputeOpen { age_secs: i64 },
    ProgressNetting { age_secs: i64 },
    /// Grace window lapsed with the request still pending. Needs an operator.
    NettingWindowLapsed { age_secs: i64 },
    NoHand,
    Settled {
        hand_id: u64,
        kicked: Vec<usize>,
        timeout: bool,
        netting_request: Option<u64>,
    },
}

impl TableOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            TableOutcome::DisputeTooEarly { .. } => "dispute_too_early",
            TableOutcome::DisputeOpen { .. } => "dispute_open",
            TableOutcome::ProgressNetting { .. } => "progress_netting",
            TableOutcome::NettingWindowLapsed { .. } => "netting_window_lapsed",
            TableOutcome::NoHand => "no_hand",
            TableOutcome::Settled { .. } => "settled",
        }
    }
}

/// Result of `reconcile_table`: the branch taken and what was published.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReconciliation {
    pub table_addr: String,
    pub outcome: TableOutcome,
    pub published: Vec<ControlEvent>,
}

/// Per-table line of a [`ScanReport`]. Exactly one of `outcome` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableScan {
    pub table_addr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TableOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub published: Vec<ControlEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableScan {
    pub fn ok(r: TableReconciliation) -> Self {
        Self {
            table_addr: r.table_addr,
            outcome: Some(r.outcome),
            published: r.published,
            error: None,
        }
    }

    pub fn failed(table_addr: String, err: &ReconcileError) -> Self {
        Self {
            table_addr,
            outcome: None,
            published: Vec::new(),
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    /// Unix seconds every table in this pass was evaluated against.
    pub now: i64,
    pub tables: Vec<TableScan>,
}

impl ScanReport {
    pub fn error_count(&self) -> usize {
        self.tables.iter().filter(|t| t.error.is_some()).count()
    }

    pub fn published_count(&self) -> usize {
        self.tables.iter().map(|t| t.published.len()).sum()
    }

    /// Tables whose pending request outlived the grace window.
    pub fn lapsed_tables(&self) -> impl Iterator<Item = &TableScan> {
        self.tables
            .iter()
            .filter(|t| matches!(t.outcome, Some(TableOutcome::NettingWindowLapsed { .. })))
    }

    pub fn get(&self, table_addr: &str) -> Option<&TableScan> {
        self.tables.iter().find(|t| t.table_addr == table_addr)
    }
}
