use std::sync::Mutex;

use async_trait::async_trait;

use tk_bus::{PublishError, Publisher};
use tk_schemas::{ControlEnvelope, ControlEvent, LiveUpdate, Subject};

/// Records every publish. Optionally rejects one subject.
#[derive(Default)]
pub struct RecordingPublisher {
    envelopes: Mutex<Vec<ControlEnvelope>>,
    live: Mutex<Vec<LiveUpdate>>,
    reject: Mutex<Option<Subject>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_subject(&self, subject: Subject) {
        *self.reject.lock().unwrap() = Some(subject);
    }

    pub fn envelopes(&self) -> Vec<ControlEnvelope> {
        self.envelopes.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<ControlEvent> {
        self.envelopes()
            .iter()
            .map(|env| env.event().expect("recorded envelope decodes"))
            .collect()
    }

    pub fn subjects(&self) -> Vec<Subject> {
        self.envelopes().iter().map(|env| env.subject).collect()
    }

    pub fn live(&self) -> Vec<LiveUpdate> {
        self.live.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.envelopes.lock().unwrap().clear();
        self.live.lock().unwrap().clear();
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish_envelope(&self, env: &ControlEnvelope) -> Result<(), PublishError> {
        if *self.reject.lock().unwrap() == Some(env.subject) {
            return Err(PublishError::rejected(env.subject, &env.table_addr, "queue full"));
        }
        self.envelopes.lock().unwrap().push(env.clone());
        Ok(())
    }

    async fn publish_live(&self, update: &LiveUpdate) -> Result<(), PublishError> {
        self.live.lock().unwrap().push(update.clone());
        Ok(())
    }
}
