use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use tk_reconcile::{ChainReader, ReadError, TableRegistry};
use tk_schemas::{ChainLineup, ChainSeat, NettingStatus};

#[derive(Default)]
struct Inner {
    tables: BTreeMap<String, (NettingStatus, Vec<ChainSeat>)>,
    failing: BTreeSet<String>,
    registry_down: bool,
    reads: usize,
}

/// Escrow contract + table registry backed by a map.
#[derive(Default)]
pub struct FakeChain {
    inner: Mutex<Inner>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table(&self, table_addr: &str, status: NettingStatus, seats: Vec<ChainSeat>) {
        let mut g = self.inner.lock().unwrap();
        g.tables.insert(table_addr.to_string(), (status, seats));
    }

    pub fn set_status(&self, table_addr: &str, lhn: u64, lnr: u64, lnt: i64) {
        let status = NettingStatus {
            last_hand_netted: lhn,
            last_netting_request_hand_id: lnr,
            last_netting_request_time: lnt,
        };
        let mut g = self.inner.lock().unwrap();
        g.tables.entry(table_addr.to_string()).or_default().0 = status;
    }

    /// Every read for this table fails from now on.
    pub fn fail_table(&self, table_addr: &str) {
        self.inner.lock().unwrap().failing.insert(table_addr.to_string());
    }

    pub fn take_registry_down(&self) {
        self.inner.lock().unwrap().registry_down = true;
    }

    /// Number of contract reads served so far.
    pub fn reads(&self) -> usize {
        self.inner.lock().unwrap().reads
    }

    fn read<T>(
        &self,
        table_addr: &str,
        call: &'static str,
        f: impl FnOnce(&(NettingStatus, Vec<ChainSeat>)) -> T,
    ) -> Result<T, ReadError> {
        let mut g = self.inner.lock().unwrap();
        g.reads += 1;
        if g.failing.contains(table_addr) {
            return Err(ReadError::chain(table_addr, call, "execution reverted"));
        }
        g.tables
            .get(table_addr)
            .map(f)
            .ok_or_else(|| ReadError::chain(table_addr, call, "unknown table"))
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn last_hand_netted(&self, table_addr: &str) -> Result<u64, ReadError> {
        self.read(table_addr, "lastHandNetted", |(s, _)| s.last_hand_netted)
    }

    async fn last_netting_request_hand_id(&self, table_addr: &str) -> Result<u64, ReadError> {
        self.read(table_addr, "lastNettingRequestHandId", |(s, _)| {
            s.last_netting_request_hand_id
        })
    }

    async fn last_netting_request_time(&self, table_addr: &str) -> Result<i64, ReadError> {
        self.read(table_addr, "lastNettingRequestTime", |(s, _)| {
            s.last_netting_request_time
        })
    }

    async fn lineup(&self, table_addr: &str) -> Result<ChainLineup, ReadError> {
        self.read(table_addr, "getLineup", |(s, seats)| ChainLineup {
            last_hand_netted: s.last_hand_netted,
            seats: seats.clone(),
        })
    }
}

#[async_trait]
impl TableRegistry for FakeChain {
    async fn list_tables(&self) -> Result<Vec<String>, ReadError> {
        let g = self.inner.lock().unwrap();
        if g.registry_down {
            return Err(ReadError::Registry("factory call reverted".to_string()));
        }
        Ok(g.tables.keys().cloned().collect())
    }
}
