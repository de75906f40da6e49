//! Envelope (run_id, sequence number) applied to every `OutputEvent` on the wire.

use crate::event::OutputEvent;
use serde_json::Value;

/// Envelope fields attached to each emitted line: which run it belongs to and its
/// position in that run's stream.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    pub run_id: Option<String>,
    pub sequence: Option<u64>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_id(mut self, id: impl Into<String>) -> Self {
        self.run_id = Some(id.into());
        self
    }

    pub fn with_sequence(mut self, seq: u64) -> Self {
        self.sequence = Some(seq);
        self
    }

    /// Merges envelope fields into the given JSON object. Does not overwrite existing keys.
    pub fn inject_into(&self, obj: &mut Value) {
        let Some(obj) = obj.as_object_mut() else {
            return;
        };
        if let Some(ref id) = self.run_id {
            obj.entry("run_id")
                .or_insert_with(|| Value::String(id.clone()));
        }
        if let Some(seq) = self.sequence {
            obj.entry("sequence")
                .or_insert_with(|| Value::Number(serde_json::Number::from(seq)));
        }
    }
}

/// Per-run envelope state: the run id and a monotonic sequence counter.
pub struct EnvelopeState {
    pub run_id: String,
    pub next_sequence: u64,
}

impl EnvelopeState {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            next_sequence: 0,
        }
    }

    /// Converts an event to JSON and stamps it with this run's envelope, advancing the
    /// sequence counter.
    pub fn to_json(&mut self, event: &OutputEvent) -> Result<Value, serde_json::Error> {
        let mut value = event.to_value()?;
        let env = Envelope::new()
            .with_run_id(self.run_id.clone())
            .with_sequence(self.next_sequence);
        self.next_sequence += 1;
        env.inject_into(&mut value);
        Ok(value)
    }
}
