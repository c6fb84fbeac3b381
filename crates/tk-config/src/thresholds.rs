//! Timing thresholds shared by the reconciler.
//!
//! All values are whole seconds compared against wall-clock unix time.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Before this age a pending netting request is left alone so in-flight
/// receipts can land.
pub const DISPUTE_REACT_AFTER_SECS: i64 = 180;

/// Length of the on-chain dispute window after a netting request.
pub const DISPUTE_WINDOW_SECS: i64 = 600;

/// Age after which a pending netting request is no longer progressed.
pub const SETTLEMENT_GRACE_SECS: i64 = 3600;

/// A seat sitting out for longer than this is kicked.
pub const KICK_AFTER_SECS: i64 = 300;

/// Hands whose last change is older than this are left alone.
pub const HAND_STALE_AFTER_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub dispute_react_after_secs: i64,
    pub dispute_window_secs: i64,
    pub settlement_grace_secs: i64,
    pub kick_after_secs: i64,
    pub hand_stale_after_secs: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            dispute_react_after_secs: DISPUTE_REACT_AFTER_SECS,
            dispute_window_secs: DISPUTE_WINDOW_SECS,
            settlement_grace_secs: SETTLEMENT_GRACE_SECS,
            kick_after_secs: KICK_AFTER_SECS,
            hand_stale_after_secs: HAND_STALE_AFTER_SECS,
        }
    }
}

impl Thresholds {
    /// Reject orderings under which some reconciler branch becomes
    /// unreachable or overlaps another.
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("dispute_react_after_secs", self.dispute_react_after_secs),
            ("dispute_window_secs", self.dispute_window_secs),
            ("settlement_grace_secs", self.settlement_grace_secs),
            ("kick_after_secs", self.kick_after_secs),
            ("hand_stale_after_secs", self.hand_stale_after_secs),
        ];
        for (name, v) in all {
            if v <= 0 {
                bail!("CONFIG_THRESHOLD_INVALID {name}={v}: must be > 0");
            }
        }
        if self.dispute_react_after_secs >= self.dispute_window_secs {
            bail!(
                "CONFIG_THRESHOLD_INVALID dispute_react_after_secs={} must be < dispute_window_secs={}",
                self.dispute_react_after_secs,
                self.dispute_window_secs
            );
        }
        if self.dispute_window_secs >= self.settlement_grace_secs {
            bail!(
                "CONFIG_THRESHOLD_INVALID dispute_window_secs={} must be < settlement_grace_secs={}",
                self.dispute_window_secs,
                self.settlement_grace_secs
            );
        }
        Ok(())
    }
}
