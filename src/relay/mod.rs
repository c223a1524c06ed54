//! Event relay
//!
//! Receives lifecycle callbacks from the upload engine, forwards a normalized
//! event to the attached [`EventSink`], and on terminal events advances the
//! owner's queue through the [`QueueAdvancer`].
//!
//! ```text
//! engine ──on_*──▶ EventRelay ──emit──▶ EventSink
//!                      │
//!                      └─(terminal only)─▶ QueueAdvancer ──▶ QueueOwner ──▶ engine
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use upload_relay::config::Config;
//! use upload_relay::event::ServerResponse;
//! use upload_relay::relay::EventRelay;
//! use upload_relay::sink::MemorySink;
//!
//! let relay = EventRelay::new(&Config::default());
//! let sink = Arc::new(MemorySink::new());
//! relay.register(sink.clone());
//!
//! relay.on_progress("upload-1", 40);
//! relay.on_completed("upload-1", ServerResponse::new(200, "ok"));
//!
//! let names: Vec<_> = sink.events().into_iter().map(|e| e.name).collect();
//! assert_eq!(names, ["RNUploadManager-progress", "RNUploadManager-completed"]);
//! ```

use crate::config::{Config, DetachedOwnerPolicy};
use crate::event::{ServerResponse, UploadEvent};
use crate::metrics;
use crate::queue::QueueOwner;
use crate::sink::EventSink;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

mod advancer;

pub use advancer::QueueAdvancer;

/// Relay errors
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Queue owner detached while advancing past upload {0}")]
    OwnerDetached(String),
}

/// What happened to an event on its way to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No sink registered
    Detached,
    /// The sink reported an error
    Failed,
}

pub struct EventRelay {
    namespace: String,
    sink: RwLock<Option<Arc<dyn EventSink>>>,
    advancer: QueueAdvancer,
}

impl EventRelay {
    pub fn new(config: &Config) -> Self {
        Self::with_namespace(
            config.events.namespace.clone(),
            config.queue.on_detached_owner,
        )
    }

    pub fn with_namespace(namespace: impl Into<String>, policy: DetachedOwnerPolicy) -> Self {
        Self {
            namespace: namespace.into(),
            sink: RwLock::new(None),
            advancer: QueueAdvancer::new(policy),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Attach the listener; replaces any previous one
    pub fn register(&self, sink: Arc<dyn EventSink>) {
        *self.sink.write() = Some(sink);
        debug!(namespace = %self.namespace, "Event sink registered");
    }

    /// Detach the listener, returning it
    pub fn unregister(&self) -> Option<Arc<dyn EventSink>> {
        let previous = self.sink.write().take();
        debug!(namespace = %self.namespace, "Event sink unregistered");
        previous
    }

    pub fn is_registered(&self) -> bool {
        self.sink.read().is_some()
    }

    pub fn attach_owner<O: QueueOwner + 'static>(&self, owner: &Arc<O>) {
        self.advancer.attach(owner);
    }

    pub fn detach_owner(&self) {
        self.advancer.detach();
    }

    pub fn advancer(&self) -> &QueueAdvancer {
        &self.advancer
    }

    pub fn on_progress(&self, upload_id: &str, percent: u32) -> Delivery {
        self.dispatch(UploadEvent::progress(upload_id, percent))
    }

    /// Absent `response` leaves out responseCode/responseBody; absent
    /// `message` becomes "Unknown exception"
    pub fn on_error(
        &self,
        upload_id: &str,
        response: Option<ServerResponse>,
        message: Option<&str>,
    ) -> Delivery {
        self.dispatch(UploadEvent::error(upload_id, response, message))
    }

    pub fn on_completed(&self, upload_id: &str, response: ServerResponse) -> Delivery {
        self.dispatch(UploadEvent::completed(upload_id, response))
    }

    pub fn on_cancelled(&self, upload_id: &str) -> Delivery {
        self.dispatch(UploadEvent::cancelled(upload_id))
    }

    /// Forward `event`, then advance the queue if it is terminal
    ///
    /// Advancement happens regardless of whether the event was delivered.
    #[tracing::instrument(
        name = "relay.dispatch",
        level = "debug",
        skip(self, event),
        fields(upload.id = %event.upload_id(), event.kind = %event.kind())
    )]
    pub fn dispatch(&self, event: UploadEvent) -> Delivery {
        let delivery = self.emit(&event);

        if event.is_terminal() {
            // Already logged by the advancer
            let _ = self.advancer.advance(event.upload_id());
        }

        delivery
    }

    /// Emit to the sink without touching the queue
    pub fn emit(&self, event: &UploadEvent) -> Delivery {
        let kind = event.kind();
        let sink = self.sink.read().clone();

        let Some(sink) = sink else {
            warn!(
                upload.id = %event.upload_id(),
                event.kind = %kind,
                "Dropping event, no sink registered"
            );
            metrics::record_event_dropped(kind.as_str(), "detached");
            return Delivery::Detached;
        };

        let name = kind.event_name(&self.namespace);
        match sink.emit(&name, &event.to_record()) {
            Ok(()) => {
                metrics::record_event_emitted(kind.as_str());
                debug!(event.name = %name, "Event emitted");
                Delivery::Delivered
            }
            Err(e) => {
                warn!(event.name = %name, error = %e, "Event sink failed");
                metrics::record_event_dropped(kind.as_str(), "sink_error");
                Delivery::Failed
            }
        }
    }
}
