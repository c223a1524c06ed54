//! Upload manager
//!
//! The queue owner. Keeps the pending-uploads queue, starts queued uploads
//! on the engine one at a time, and exposes the caller-facing operations
//! (enqueue, direct start, cancel, clear).
//!
//! The relay holds only a `Weak` reference to the manager, so the manager
//! must be kept in an `Arc` by the host for as long as events can arrive.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use upload_relay::config::Config;
//! use upload_relay::manager::UploadManager;
//! use upload_relay::relay::EventRelay;
//! use upload_relay::upload::{EngineError, UploadEngine, UploadOptions, UploadRequest};
//!
//! struct NoopEngine;
//!
//! impl UploadEngine for NoopEngine {
//!     fn start(&self, _request: &UploadRequest) -> Result<(), EngineError> { Ok(()) }
//!     fn stop(&self, _upload_id: &str) -> Result<(), EngineError> { Ok(()) }
//!     fn stop_all(&self) -> Result<(), EngineError> { Ok(()) }
//! }
//!
//! let config = Config::default();
//! let manager = Arc::new(UploadManager::new(&config, Arc::new(NoopEngine)));
//! let relay = EventRelay::new(&config);
//! relay.attach_owner(&manager);
//!
//! let mut options = UploadOptions::new("https://example.com/upload", "/tmp/a.jpg");
//! options.custom_upload_id = Some("a".into());
//! manager.add_to_upload_queue(&options).unwrap();
//! assert_eq!(manager.active_id().as_deref(), Some("a"));
//!
//! relay.on_cancelled("a");
//! assert!(manager.active_id().is_none());
//! ```

use crate::config::{Config, UploadDefaults};
use crate::metrics;
use crate::queue::{MemoryQueue, QueueOwner, UploadQueue};
use crate::upload::{EngineError, OptionsError, UploadEngine, UploadOptions};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Manager errors
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Invalid upload options: {0}")]
    InvalidOptions(#[from] OptionsError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Upload ID must not be empty")]
    EmptyUploadId,
}

/// Where an id stands from the queue's point of view
///
/// Ids that reached a terminal state are no longer tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Active,
}

struct QueueState {
    queue: Box<dyn UploadQueue>,
    active: Option<String>,
}

pub struct UploadManager {
    state: Mutex<QueueState>,
    engine: Arc<dyn UploadEngine>,
    defaults: UploadDefaults,
}

impl UploadManager {
    pub fn new(config: &Config, engine: Arc<dyn UploadEngine>) -> Self {
        Self::with_queue(config, engine, Box::new(MemoryQueue::new()))
    }

    pub fn with_queue(
        config: &Config,
        engine: Arc<dyn UploadEngine>,
        queue: Box<dyn UploadQueue>,
    ) -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue,
                active: None,
            }),
            engine,
            defaults: config.uploads.clone(),
        }
    }

    /// Queue an upload; starts it right away when nothing is running
    ///
    /// An upload that outlived `clear_upload_queue` still counts as running.
    /// Returns the upload id: `customUploadId` when given, otherwise a new UUID.
    pub fn add_to_upload_queue(&self, options: &UploadOptions) -> Result<String, ManagerError> {
        let upload_id = Self::upload_id_for(options)?;
        let request = options.resolve(&self.defaults, upload_id.clone())?;

        let idle = {
            let mut state = self.state.lock();
            state.queue.push(request);
            state.active.is_none()
        };
        info!(upload.id = %upload_id, "Upload queued");

        if idle {
            self.start_next_in_queue();
        }
        Ok(upload_id)
    }

    /// Start an upload directly, outside the queue
    pub fn start_upload(&self, options: &UploadOptions) -> Result<String, ManagerError> {
        let upload_id = Self::upload_id_for(options)?;
        let request = options.resolve(&self.defaults, upload_id.clone())?;

        let result = self.engine.start(&request);
        metrics::record_upload_start("direct", result.is_ok());
        result?;

        info!(upload.id = %upload_id, url = %request.url, "Upload started");
        Ok(upload_id)
    }

    /// Ask the engine to stop one upload; it reports back as cancelled
    pub fn cancel_upload(&self, upload_id: &str) -> Result<(), ManagerError> {
        if upload_id.is_empty() {
            return Err(ManagerError::EmptyUploadId);
        }
        self.engine.stop(upload_id)?;
        debug!(upload.id = %upload_id, "Cancellation requested");
        Ok(())
    }

    pub fn cancel_all_uploads(&self) -> Result<(), ManagerError> {
        self.engine.stop_all()?;
        debug!("Cancellation of all uploads requested");
        Ok(())
    }

    /// Drop every queued item; a running upload keeps running
    pub fn clear_upload_queue(&self) {
        let mut state = self.state.lock();
        let dropped = state.queue.len();
        state.queue.clear();
        info!(dropped, "Upload queue cleared");
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.state.lock().queue.ids()
    }

    pub fn active_id(&self) -> Option<String> {
        self.state.lock().active.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    pub fn state(&self, upload_id: &str) -> Option<UploadState> {
        let state = self.state.lock();
        if state.active.as_deref() == Some(upload_id) {
            Some(UploadState::Active)
        } else if state.queue.ids().iter().any(|id| id == upload_id) {
            Some(UploadState::Pending)
        } else {
            None
        }
    }

    fn upload_id_for(options: &UploadOptions) -> Result<String, ManagerError> {
        match &options.custom_upload_id {
            Some(id) if id.is_empty() => Err(ManagerError::EmptyUploadId),
            Some(id) => Ok(id.clone()),
            None => Ok(Uuid::new_v4().to_string()),
        }
    }
}

impl QueueOwner for UploadManager {
    fn remove_from_queue(&self, upload_id: &str) {
        let mut state = self.state.lock();
        let removed = state.queue.remove(upload_id);
        if state.active.as_deref() == Some(upload_id) {
            state.active = None;
        }
        debug!(upload.id = %upload_id, removed, "Removed from queue");
    }

    fn start_next_in_queue(&self) {
        loop {
            // The engine may call back into the relay from `start`, which
            // re-enters `remove_from_queue`; the lock must not be held there.
            let next = {
                let mut state = self.state.lock();
                if let Some(active) = &state.active {
                    // Either the head itself or an upload left running by a clear
                    debug!(upload.id = %active, "Upload already running");
                    return;
                }
                match state.queue.pop(false) {
                    None => {
                        debug!("Upload queue drained");
                        return;
                    }
                    Some(head) => {
                        state.active = Some(head.id.clone());
                        head
                    }
                }
            };

            match self.engine.start(&next) {
                Ok(()) => {
                    metrics::record_upload_start("queue", true);
                    info!(upload.id = %next.id, url = %next.url, "Started queued upload");
                    return;
                }
                Err(e) => {
                    metrics::record_upload_start("queue", false);
                    error!(upload.id = %next.id, error = %e, "Engine refused queued upload, skipping");
                    let mut state = self.state.lock();
                    state.queue.remove(&next.id);
                    if state.active.as_deref() == Some(next.id.as_str()) {
                        state.active = None;
                    }
                }
            }
        }
    }
}
