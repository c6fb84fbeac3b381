use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use tk_bus::{PublishError, Publisher};
use tk_schemas::{ChangeKind, ControlEvent, HandChange, HandRecord, HandState, LiveUpdate, Seat};

use crate::GameOracle;

#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// What one `process` call did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessOutcome {
    /// A live-update payload was rendered and published.
    pub live_published: bool,
    /// Control events published, in derivation order.
    pub events: Vec<ControlEvent>,
}

impl ProcessOutcome {
    pub fn noop() -> Self {
        Self::default()
    }
}

pub struct HandStreamReactor {
    oracle: Arc<dyn GameOracle>,
    bus: Arc<dyn Publisher>,
}

impl HandStreamReactor {
    pub fn new(oracle: Arc<dyn GameOracle>, bus: Arc<dyn Publisher>) -> Self {
        Self { oracle, bus }
    }

    pub async fn process(&self, change: &HandChange) -> Result<ProcessOutcome, ReactorError> {
        if !matches!(change.kind, ChangeKind::Insert | ChangeKind::Modify) {
            debug!(table = %change.table_addr, kind = ?change.kind, "ignoring change kind");
            return Ok(ProcessOutcome::noop());
        }
        let Some(after) = change.after.as_ref() else {
            debug!(table = %change.table_addr, hand_id = change.hand_id, "change carries no new image");
            return Ok(ProcessOutcome::noop());
        };

        let live = self.render(&change.table_addr, after).await;

        let events = match (change.kind, change.before.as_ref()) {
            (ChangeKind::Modify, Some(before)) => self.derive(&change.table_addr, before, after).await,
            _ => Vec::new(),
        };

        let mut sends: Vec<BoxFuture<'_, Result<(), PublishError>>> = Vec::with_capacity(events.len() + 1);
        if let Some(update) = live.as_ref() {
            sends.push(self.bus.publish_live(update).boxed());
        }
        for ev in &events {
            info!(table = %ev.table_addr(), subject = %ev.subject(), "publish control event");
            sends.push(self.bus.publish(ev).boxed());
        }

        // Every send runs to completion; the first failure becomes the result.
        join_all(sends).await.into_iter().collect::<Result<(), _>>()?;

        Ok(ProcessOutcome {
            live_published: live.is_some(),
            events,
        })
    }

    async fn render(&self, table_addr: &str, after: &HandRecord) -> Option<LiveUpdate> {
        match self.oracle.render(after).await {
            Ok(payload) => Some(LiveUpdate {
                table_addr: table_addr.to_string(),
                hand_id: after.hand_id,
                payload,
            }),
            Err(err) => {
                warn!(table = %table_addr, hand_id = after.hand_id, error = %err, "render failed; skipping live update");
                None
            }
        }
    }

    async fn derive(&self, table_addr: &str, before: &HandRecord, after: &HandRecord) -> Vec<ControlEvent> {
        let mut events: Vec<ControlEvent> = Vec::new();
        let mut push = |ev: ControlEvent| {
            if !events.contains(&ev) {
                events.push(ev);
            }
        };

        // Leave: exit_hand went from unset to set.
        for (pos, seat) in after.lineup.iter().enumerate() {
            let Some(exit_hand) = seat.exit_request() else { continue };
            let was_set = before.lineup.get(pos).and_then(Seat::exit_request).is_some();
            if was_set {
                continue;
            }
            push(ControlEvent::TableLeave {
                table_addr: table_addr.to_string(),
                leaver_addr: seat.address.clone(),
                exit_hand,
            });
            if exit_hand < after.hand_id {
                push(ControlEvent::TableNettingRequest {
                    table_addr: table_addr.to_string(),
                    hand_id: exit_hand,
                });
            }
        }

        // Completion.
        let (before_complete, after_complete) = tokio::join!(self.is_complete(before), self.is_complete(after));
        if after_complete && !before_complete {
            if after.state != HandState::Waiting {
                push(ControlEvent::HandComplete {
                    table_addr: table_addr.to_string(),
                    hand_id: after.hand_id,
                });
            }
            if after.has_pending_leave() && after.netting.is_none() {
                // A waiting record has already advanced to the next hand.
                let hand_id = if after.state == HandState::Waiting {
                    after.hand_id.saturating_sub(1)
                } else {
                    after.hand_id
                };
                push(ControlEvent::TableNettingRequest {
                    table_addr: table_addr.to_string(),
                    hand_id,
                });
            }
        }

        // Settlement completion.
        if let (Some(prev), Some(netting)) = (before.netting.as_ref(), after.netting.as_ref()) {
            if netting.signer_count() > prev.signer_count() {
                match self.oracle.count_active_players(&after.lineup, after.state).await {
                    Ok(active) if netting.is_complete(active) => push(ControlEvent::TableNettingComplete {
                        table_addr: table_addr.to_string(),
                        hand_id: after.hand_id,
                        netting: netting.clone(),
                    }),
                    Ok(active) => debug!(
                        table = %table_addr,
                        signed = netting.signer_count(),
                        active,
                        "netting still collecting signatures"
                    ),
                    Err(err) => warn!(table = %table_addr, error = %err, "active count unavailable; netting not completed"),
                }
            }
        }

        events
    }

    async fn is_complete(&self, hand: &HandRecord) -> bool {
        match self.oracle.is_hand_complete(&hand.lineup, hand.dealer, hand.state).await {
            Ok(done) => done,
            Err(err) => {
                warn!(table = %hand.table_addr, hand_id = hand.hand_id, error = %err, "completion check failed; treating as incomplete");
                false
            }
        }
    }
}
