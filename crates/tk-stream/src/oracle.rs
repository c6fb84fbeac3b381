use async_trait::async_trait;
use serde_json::Value;

use tk_schemas::{HandRecord, HandState, Seat};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The oracle could not evaluate the snapshot.
    #[error("oracle rejected snapshot: {0}")]
    Malformed(String),

    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// External game-rules component. Consulted, never owned.
#[async_trait]
pub trait GameOracle: Send + Sync {
    async fn is_hand_complete(
        &self,
        lineup: &[Seat],
        dealer: usize,
        state: HandState,
    ) -> Result<bool, OracleError>;

    async fn count_active_players(&self, lineup: &[Seat], state: HandState) -> Result<usize, OracleError>;

    /// UI payload for the table's live-update channel.
    async fn render(&self, hand: &HandRecord) -> Result<Value, OracleError>;
}
