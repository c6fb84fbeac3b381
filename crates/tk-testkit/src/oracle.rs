use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::{json, Value};

use tk_schemas::{HandRecord, HandState, Seat};
use tk_stream::{GameOracle, OracleError};

/// Rule-free oracle: a hand is complete when its state is in the configured
/// set, and a seat is active when it is occupied and not sitting out.
pub struct ScriptedOracle {
    complete_states: BTreeSet<&'static str>,
    fail_completion: bool,
    fail_render: bool,
    fail_active_count: bool,
    active_override: Option<usize>,
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self {
            complete_states: ["showdown", "waiting"].into_iter().collect(),
            fail_completion: false,
            fail_render: false,
            fail_active_count: false,
            active_override: None,
        }
    }
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete_in(mut self, states: &[HandState]) -> Self {
        self.complete_states = states.iter().map(HandState::as_str).collect();
        self
    }

    /// Every completion check errors, as on a malformed snapshot.
    pub fn failing_completion(mut self) -> Self {
        self.fail_completion = true;
        self
    }

    pub fn failing_render(mut self) -> Self {
        self.fail_render = true;
        self
    }

    pub fn failing_active_count(mut self) -> Self {
        self.fail_active_count = true;
        self
    }

    pub fn with_active_count(mut self, n: usize) -> Self {
        self.active_override = Some(n);
        self
    }
}

#[async_trait]
impl GameOracle for ScriptedOracle {
    async fn is_hand_complete(
        &self,
        lineup: &[Seat],
        dealer: usize,
        state: HandState,
    ) -> Result<bool, OracleError> {
        if self.fail_completion {
            return Err(OracleError::Malformed("receipt chain broken".to_string()));
        }
        if !lineup.is_empty() && dealer >= lineup.len() {
            return Err(OracleError::Malformed(format!("dealer {dealer} out of range")));
        }
        Ok(self.complete_states.contains(state.as_str()))
    }

    async fn count_active_players(&self, lineup: &[Seat], _state: HandState) -> Result<usize, OracleError> {
        if self.fail_active_count {
            return Err(OracleError::Unavailable("active count unavailable".to_string()));
        }
        if let Some(n) = self.active_override {
            return Ok(n);
        }
        Ok(lineup
            .iter()
            .filter(|s| !s.is_empty() && s.sitout.is_none())
            .count())
    }

    async fn render(&self, hand: &HandRecord) -> Result<Value, OracleError> {
        if self.fail_render {
            return Err(OracleError::Unavailable("renderer down".to_string()));
        }
        Ok(json!({
            "handId": hand.hand_id,
            "state": hand.state.as_str(),
            "seats": hand.lineup.len(),
        }))
    }
}
