use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use tk_bus::Publisher;
use tk_config::Thresholds;
use tk_schemas::ControlEvent;

use crate::decide::{decide_pending, decide_settled, PendingDecision};
use crate::{
    ChainReader, HandStore, ReconcileError, ScanReport, TableOutcome, TableReconciliation,
    TableRegistry, TableScan,
};

/// Poll-driven reconciler. Holds only client handles; no decision state.
#[derive(Clone)]
pub struct Reconciler {
    registry: Arc<dyn TableRegistry>,
    chain: Arc<dyn ChainReader>,
    store: Arc<dyn HandStore>,
    bus: Arc<dyn Publisher>,
    thresholds: Thresholds,
}

impl Reconciler {
    pub fn new(
        registry: Arc<dyn TableRegistry>,
        chain: Arc<dyn ChainReader>,
        store: Arc<dyn HandStore>,
        bus: Arc<dyn Publisher>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            registry,
            chain,
            store,
            bus,
            thresholds,
        }
    }

    /// One pass over every registered table, evaluated at the current time.
    pub async fn scan(&self) -> Result<ScanReport, ReconcileError> {
        self.scan_at(Utc::now().timestamp()).await
    }

    /// One pass at a fixed `now`. Tables run concurrently; a failing table is
    /// recorded in the report and does not affect the others. Only a registry
    /// failure fails the whole pass.
    pub async fn scan_at(&self, now: i64) -> Result<ScanReport, ReconcileError> {
        let started_at = Utc::now();
        let tables = self.registry.list_tables().await?;
        debug!(tables = tables.len(), now, "reconcile scan started");

        let results = join_all(
            tables
                .iter()
                .map(|addr| async move { (addr, self.reconcile_table_at(addr, now).await) }),
        )
        .await;

        let tables: Vec<TableScan> = results
            .into_iter()
            .map(|(addr, res)| match res {
                Ok(r) => TableScan::ok(r),
                Err(err) => {
                    warn!(table = %addr, error = %err, "table reconciliation failed");
                    TableScan::failed(addr.clone(), &err)
                }
            })
            .collect();

        let report = ScanReport {
            started_at,
            now,
            tables,
        };
        info!(
            tables = report.tables.len(),
            published = report.published_count(),
            errors = report.error_count(),
            "reconcile scan finished"
        );
        Ok(report)
    }

    pub async fn reconcile_table(&self, table_addr: &str) -> Result<TableReconciliation, ReconcileError> {
        self.reconcile_table_at(table_addr, Utc::now().timestamp()).await
    }

    pub async fn reconcile_table_at(
        &self,
        table_addr: &str,
        now: i64,
    ) -> Result<TableReconciliation, ReconcileError> {
        let status = self.chain.netting_status(table_addr).await?;

        if status.is_pending() {
            let decision = decide_pending(&status, now, &self.thresholds);
            let published: Vec<ControlEvent> = decision.event(table_addr, &status).into_iter().collect();
            self.publish_all(&published).await?;

            let outcome = match decision {
                PendingDecision::TooEarly { age_secs } => TableOutcome::DisputeTooEarly { age_secs },
                PendingDecision::HandleDispute { age_secs } => TableOutcome::DisputeOpen { age_secs },
                PendingDecision::ProgressNetting { age_secs } => TableOutcome::ProgressNetting { age_secs },
                PendingDecision::Lapsed { age_secs } => {
                    warn!(
                        table = %table_addr,
                        age_secs,
                        last_hand_netted = status.last_hand_netted,
                        last_netting_request_hand_id = status.last_netting_request_hand_id,
                        "netting request outlived the settlement grace window; manual intervention required"
                    );
                    TableOutcome::NettingWindowLapsed { age_secs }
                }
            };
            return Ok(TableReconciliation {
                table_addr: table_addr.to_string(),
                outcome,
                published,
            });
        }

        let (hand, chain_lineup) = tokio::try_join!(
            self.store.get_last_hand(table_addr),
            self.chain.lineup(table_addr),
        )?;

        let Some(hand) = hand else {
            debug!(table = %table_addr, "no hand recorded; nothing to reconcile");
            return Ok(TableReconciliation {
                table_addr: table_addr.to_string(),
                outcome: TableOutcome::NoHand,
                published: Vec::new(),
            });
        };

        let decision = decide_settled(&status, &hand, &chain_lineup, now, &self.thresholds);
        let published = decision.events(table_addr);
        self.publish_all(&published).await?;

        Ok(TableReconciliation {
            table_addr: table_addr.to_string(),
            outcome: TableOutcome::Settled {
                hand_id: hand.hand_id,
                kicked: decision.kick,
                timeout: decision.timeout,
                netting_request: decision.netting_request,
            },
            published,
        })
    }

    async fn publish_all(&self, events: &[ControlEvent]) -> Result<(), ReconcileError> {
        for ev in events {
            info!(table = %ev.table_addr(), subject = %ev.subject(), "publish control event");
            self.bus.publish(ev).await?;
        }
        Ok(())
    }
}
