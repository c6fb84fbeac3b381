use async_trait::async_trait;

use tk_schemas::{ChainLineup, HandRecord, NettingStatus};

/// Read failure against the chain, the store or the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("chain read `{call}` failed for table {table_addr}: {reason}")]
    Chain {
        table_addr: String,
        call: &'static str,
        reason: String,
    },

    #[error("store read failed for table {table_addr}: {reason}")]
    Store { table_addr: String, reason: String },

    #[error("table registry unavailable: {0}")]
    Registry(String),
}

impl ReadError {
    pub fn chain(table_addr: &str, call: &'static str, reason: impl ToString) -> Self {
        ReadError::Chain {
            table_addr: table_addr.to_string(),
            call,
            reason: reason.to_string(),
        }
    }

    pub fn store(table_addr: &str, reason: impl ToString) -> Self {
        ReadError::Store {
            table_addr: table_addr.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Escrow contract reads for one table.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn last_hand_netted(&self, table_addr: &str) -> Result<u64, ReadError>;

    async fn last_netting_request_hand_id(&self, table_addr: &str) -> Result<u64, ReadError>;

    /// Unix seconds.
    async fn last_netting_request_time(&self, table_addr: &str) -> Result<i64, ReadError>;

    async fn lineup(&self, table_addr: &str) -> Result<ChainLineup, ReadError>;

    /// The three netting counters, read concurrently.
    async fn netting_status(&self, table_addr: &str) -> Result<NettingStatus, ReadError> {
        let (last_hand_netted, last_netting_request_hand_id, last_netting_request_time) = tokio::try_join!(
            self.last_hand_netted(table_addr),
            self.last_netting_request_hand_id(table_addr),
            self.last_netting_request_time(table_addr),
        )?;
        Ok(NettingStatus {
            last_hand_netted,
            last_netting_request_hand_id,
            last_netting_request_time,
        })
    }
}

/// Off-chain hand store.
#[async_trait]
pub trait HandStore: Send + Sync {
    /// Most recent hand for the table. `Ok(None)` when the table has never
    /// dealt a hand.
    async fn get_last_hand(&self, table_addr: &str) -> Result<Option<HandRecord>, ReadError>;
}

/// Enumerates the tables to reconcile.
#[async_trait]
pub trait TableRegistry: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>, ReadError>;
}
