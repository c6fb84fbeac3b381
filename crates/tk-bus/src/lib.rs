//! tk-bus
//!
//! Notification bus: the single publish surface both control loops write to.
//!
//! - [`Publisher`] is the fire-and-forget contract. A successful return means
//!   the message was enqueued; there is no further acknowledgement.
//! - [`BroadcastBus`] is the in-process implementation backed by a
//!   `tokio::sync::broadcast` channel. The daemon fans it out over SSE.
//! - [`Fanout`] publishes to several publishers in order (durable outbox
//!   first, then the in-process bus). The event is stamped once, so every
//!   sink sees the same `event_id` and `ts_utc`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use tk_schemas::{ControlEnvelope, ControlEvent, LiveUpdate, Subject};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publish of {subject} for table {table_addr} rejected: {reason}")]
    Rejected {
        subject: String,
        table_addr: String,
        reason: String,
    },

    #[error("bus transport error: {0}")]
    Transport(String),
}

impl PublishError {
    pub fn rejected(subject: Subject, table_addr: &str, reason: impl Into<String>) -> Self {
        PublishError::Rejected {
            subject: subject.to_string(),
            table_addr: table_addr.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Enqueue one control decision under a freshly stamped envelope.
    async fn publish(&self, event: &ControlEvent) -> Result<(), PublishError> {
        self.publish_envelope(&ControlEnvelope::wrap(event, Utc::now())).await
    }

    /// Enqueue an already stamped control decision as-is.
    async fn publish_envelope(&self, env: &ControlEnvelope) -> Result<(), PublishError>;

    /// Enqueue one rendered UI payload on the table's live-update channel.
    async fn publish_live(&self, update: &LiveUpdate) -> Result<(), PublishError>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    async fn publish(&self, event: &ControlEvent) -> Result<(), PublishError> {
        (**self).publish(event).await
    }

    async fn publish_envelope(&self, env: &ControlEnvelope) -> Result<(), PublishError> {
        (**self).publish_envelope(env).await
    }

    async fn publish_live(&self, update: &LiveUpdate) -> Result<(), PublishError> {
        (**self).publish_live(update).await
    }
}

/// Messages carried by the in-process bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Control(ControlEnvelope),
    Live(LiveUpdate),
    LogLine { level: String, msg: String },
}

impl BusMsg {
    /// SSE event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::Control(_) => "control",
            BusMsg::Live(_) => "live",
            BusMsg::LogLine { .. } => "log",
        }
    }

    /// Table this message concerns, if any.
    pub fn table_addr(&self) -> Option<&str> {
        match self {
            BusMsg::Control(env) => Some(&env.table_addr),
            BusMsg::Live(up) => Some(&up.table_addr),
            BusMsg::Heartbeat { .. } | BusMsg::LogLine { .. } => None,
        }
    }
}

/// In-process bus. Cheap to clone; all clones share one channel.
#[derive(Clone, Debug)]
pub struct BroadcastBus {
    tx: broadcast::Sender<BusMsg>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<BusMsg>(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMsg> {
        self.tx.subscribe()
    }

    /// Send without caring whether anyone listens.
    pub fn send(&self, msg: BusMsg) {
        if self.tx.send(msg).is_err() {
            debug!("bus message dropped: no subscribers");
        }
    }

    pub fn log_line(&self, level: &str, msg: impl Into<String>) {
        self.send(BusMsg::LogLine {
            level: level.to_string(),
            msg: msg.into(),
        });
    }
}

#[async_trait]
impl Publisher for BroadcastBus {
    async fn publish_envelope(&self, env: &ControlEnvelope) -> Result<(), PublishError> {
        self.send(BusMsg::Control(env.clone()));
        Ok(())
    }

    async fn publish_live(&self, update: &LiveUpdate) -> Result<(), PublishError> {
        self.send(BusMsg::Live(update.clone()));
        Ok(())
    }
}

/// Publishes to each inner publisher in order; stops at the first failure.
pub struct Fanout {
    sinks: Vec<Arc<dyn Publisher>>,
}

impl Fanout {
    pub fn new(sinks: Vec<Arc<dyn Publisher>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl Publisher for Fanout {
    async fn publish_envelope(&self, env: &ControlEnvelope) -> Result<(), PublishError> {
        for sink in &self.sinks {
            sink.publish_envelope(env).await?;
        }
        Ok(())
    }

    async fn publish_live(&self, update: &LiveUpdate) -> Result<(), PublishError> {
        for sink in &self.sinks {
            sink.publish_live(update).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refusing;

    #[async_trait]
    impl Publisher for Refusing {
        async fn publish_envelope(&self, env: &ControlEnvelope) -> Result<(), PublishError> {
            Err(PublishError::rejected(env.subject, &env.table_addr, "closed"))
        }

        async fn publish_live(&self, _update: &LiveUpdate) -> Result<(), PublishError> {
            Err(PublishError::Transport("closed".to_string()))
        }
    }

    fn timeout_event() -> ControlEvent {
        ControlEvent::Timeout {
            table_addr: "0xtable".to_string(),
        }
    }

    #[tokio::test]
    async fn broadcast_publish_wraps_event_in_envelope() {
        let bus = BroadcastBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(&timeout_event()).await.unwrap();

        match rx.recv().await.unwrap() {
            BusMsg::Control(env) => {
                assert_eq!(env.subject, Subject::Timeout);
                assert_eq!(env.table_addr, "0xtable");
            }
            other => panic!("expected control message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_still_succeeds() {
        let bus = BroadcastBus::new(16);
        assert!(bus.publish(&timeout_event()).await.is_ok());
    }

    #[tokio::test]
    async fn fanout_stops_at_first_failure() {
        let bus = BroadcastBus::new(16);
        let mut rx = bus.subscribe();
        let sinks: Vec<Arc<dyn Publisher>> = vec![Arc::new(Refusing), Arc::new(bus.clone())];
        let fanout = Fanout::new(sinks);

        let err = fanout.publish(&timeout_event()).await.unwrap_err();
        assert!(err.to_string().contains("Timeout"));
        assert!(rx.try_recv().is_err(), "later sinks must not see the event");
    }

    #[tokio::test]
    async fn fanout_sinks_share_one_envelope() {
        let outbox = BroadcastBus::new(16);
        let live = BroadcastBus::new(16);
        let mut outbox_rx = outbox.subscribe();
        let mut live_rx = live.subscribe();
        let sinks: Vec<Arc<dyn Publisher>> = vec![Arc::new(outbox), Arc::new(live)];

        Fanout::new(sinks).publish(&timeout_event()).await.unwrap();

        let (BusMsg::Control(a), BusMsg::Control(b)) =
            (outbox_rx.recv().await.unwrap(), live_rx.recv().await.unwrap())
        else {
            panic!("expected control messages on both sinks");
        };
        assert_eq!(a.event_id, b.event_id);
        assert_eq!(a.ts_utc, b.ts_utc);
        assert_eq!(a, b);
    }

    #[test]
    fn bus_msg_exposes_table_for_filtering() {
        let live = BusMsg::Live(LiveUpdate {
            table_addr: "0xtable".to_string(),
            hand_id: 4,
            payload: serde_json::json!({}),
        });
        assert_eq!(live.table_addr(), Some("0xtable"));
        assert_eq!(live.event_name(), "live");
        assert_eq!(BusMsg::Heartbeat { ts_millis: 1 }.table_addr(), None);
    }
}
