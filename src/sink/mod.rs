//! Event sinks
//!
//! The listener side of the relay. A sink receives the namespaced event name
//! and the flat [`EventRecord`] for every forwarded event.
//!
//! - [`BroadcastSink`]: fans events out over a tokio broadcast channel
//! - [`JsonLinesSink`]: writes one JSON object per line to any writer
//! - [`MemorySink`]: keeps events in memory for inspection

use crate::event::EventRecord;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;
use tokio::sync::broadcast;

/// Sink delivery errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("No receivers subscribed")]
    NoReceivers,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// A named event as seen by a listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedEvent {
    pub name: String,
    pub record: EventRecord,
}

/// Listener receiving normalized upload events
///
/// Called from whatever thread the engine reports on; implementations must
/// not block for long.
pub trait EventSink: Send + Sync {
    fn emit(&self, name: &str, record: &EventRecord) -> Result<(), SinkError>;
}

/// Broadcast sink backed by `tokio::sync::broadcast`
///
/// Sending never blocks, so it is safe to call from engine threads that are
/// not part of a runtime.
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<EmittedEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EmittedEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, name: &str, record: &EventRecord) -> Result<(), SinkError> {
        self.tx
            .send(EmittedEvent {
                name: name.to_string(),
                record: record.clone(),
            })
            .map(|_| ())
            .map_err(|_| SinkError::NoReceivers)
    }
}

/// Writes `{"name": .., "record": {..}}` lines
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&self, name: &str, record: &EventRecord) -> Result<(), SinkError> {
        let line = serde_json::to_string(&EmittedEvent {
            name: name.to_string(),
            record: record.clone(),
        })?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps every emitted event in arrival order
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<EmittedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn events(&self) -> Vec<EmittedEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn take(&self) -> Vec<EmittedEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for MemorySink {
    fn emit(&self, name: &str, record: &EventRecord) -> Result<(), SinkError> {
        self.events.lock().push(EmittedEvent {
            name: name.to_string(),
            record: record.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_without_receivers_fails() {
        let sink = BroadcastSink::new(8);
        let result = sink.emit("ns-progress", &EventRecord::new("A"));
        assert!(matches!(result, Err(SinkError::NoReceivers)));
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscriber() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();

        sink.emit("ns-cancelled", &EventRecord::new("A")).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.name, "ns-cancelled");
        assert_eq!(received.record.id, "A");
    }

    #[test]
    fn test_json_lines_sink_writes_one_line_per_event() {
        let sink = JsonLinesSink::new(Vec::new());
        let mut record = EventRecord::new("A");
        record.progress = Some(10);
        sink.emit("ns-progress", &record).unwrap();
        sink.emit("ns-cancelled", &EventRecord::new("A")).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"name":"ns-progress","record":{"id":"A","progress":10}}"#
        );
    }

    #[test]
    fn test_memory_sink_take_drains() {
        let sink = MemorySink::new();
        sink.emit("ns-error", &EventRecord::new("A")).unwrap();
        assert_eq!(sink.take().len(), 1);
        assert!(sink.is_empty());
    }
}
