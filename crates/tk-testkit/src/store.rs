use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use tk_reconcile::{HandStore, ReadError};
use tk_schemas::HandRecord;

/// Latest hand per table.
#[derive(Default)]
pub struct InMemoryHandStore {
    hands: Mutex<BTreeMap<String, HandRecord>>,
    failing: Mutex<BTreeSet<String>>,
}

impl InMemoryHandStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table's latest hand.
    pub fn put(&self, hand: HandRecord) {
        self.hands.lock().unwrap().insert(hand.table_addr.clone(), hand);
    }

    pub fn fail_table(&self, table_addr: &str) {
        self.failing.lock().unwrap().insert(table_addr.to_string());
    }
}

#[async_trait]
impl HandStore for InMemoryHandStore {
    async fn get_last_hand(&self, table_addr: &str) -> Result<Option<HandRecord>, ReadError> {
        if self.failing.lock().unwrap().contains(table_addr) {
            return Err(ReadError::store(table_addr, "connection reset"));
        }
        Ok(self.hands.lock().unwrap().get(table_addr).cloned())
    }
}
