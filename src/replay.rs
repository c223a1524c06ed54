//! Script replay
//!
//! Drives a relay and a manager from a JSON-lines script of engine callbacks
//! and caller operations. Used by the CLI to exercise a configuration
//! end-to-end without a real upload engine.
//!
//! ```text
//! {"op": "enqueue", "options": {"url": "https://example.com/u", "path": "/tmp/a", "customUploadId": "A"}}
//! {"op": "progress", "id": "A", "percent": 50}
//! {"op": "progress_bytes", "id": "A", "sentBytes": 768, "totalBytes": 1024}
//! {"op": "completed", "id": "A", "responseCode": 200, "responseBody": "ok"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use crate::config::Config;
use crate::event::{percent_of, ServerResponse};
use crate::manager::{ManagerError, UploadManager};
use crate::relay::EventRelay;
use crate::sink::EventSink;
use crate::upload::{EngineError, UploadEngine, UploadOptions, UploadRequest};
use parking_lot::Mutex;
use serde::Deserialize;
use std::io::BufRead;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read script: {0}")]
    IoError(#[from] std::io::Error),
}

/// One script line
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Enqueue {
        options: UploadOptions,
    },
    Start {
        options: UploadOptions,
    },
    Progress {
        id: String,
        percent: u32,
    },
    /// Progress as the engine measures it, in bytes
    #[serde(rename_all = "camelCase")]
    ProgressBytes {
        id: String,
        sent_bytes: u64,
        total_bytes: u64,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        id: String,
        response_code: Option<i32>,
        response_body: Option<String>,
        message: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        id: String,
        response_code: i32,
        #[serde(default)]
        response_body: String,
    },
    Cancelled {
        id: String,
    },
    Cancel {
        id: String,
    },
    CancelAll,
    Clear,
    Register,
    Unregister,
    DropOwner,
}

/// Call received by [`RecordingEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Start(String),
    Stop(String),
    StopAll,
}

/// Engine that accepts everything and remembers what it was asked to do
#[derive(Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Ids passed to `start`, in order
    pub fn started(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                EngineCall::Start(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }
}

impl UploadEngine for RecordingEngine {
    fn start(&self, request: &UploadRequest) -> Result<(), EngineError> {
        info!(upload.id = %request.id, method = %request.method, url = %request.url, "engine: start");
        self.calls.lock().push(EngineCall::Start(request.id.clone()));
        Ok(())
    }

    fn stop(&self, upload_id: &str) -> Result<(), EngineError> {
        info!(upload.id = %upload_id, "engine: stop");
        self.calls.lock().push(EngineCall::Stop(upload_id.to_string()));
        Ok(())
    }

    fn stop_all(&self) -> Result<(), EngineError> {
        info!("engine: stop all");
        self.calls.lock().push(EngineCall::StopAll);
        Ok(())
    }
}

/// Counts from a finished replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub commands: usize,
    /// Operations the manager rejected, or issued after the owner was dropped
    pub rejected: usize,
}

pub struct Replay {
    relay: Arc<EventRelay>,
    manager: Option<Arc<UploadManager>>,
    engine: Arc<RecordingEngine>,
    sink: Arc<dyn EventSink>,
}

impl Replay {
    pub fn new(config: &Config, sink: Arc<dyn EventSink>) -> Self {
        let engine = Arc::new(RecordingEngine::new());
        let manager = Arc::new(UploadManager::new(config, engine.clone()));
        let relay = Arc::new(EventRelay::new(config));
        relay.attach_owner(&manager);
        relay.register(sink.clone());

        Self {
            relay,
            manager: Some(manager),
            engine,
            sink,
        }
    }

    pub fn relay(&self) -> &Arc<EventRelay> {
        &self.relay
    }

    pub fn manager(&self) -> Option<&Arc<UploadManager>> {
        self.manager.as_ref()
    }

    pub fn engine(&self) -> &Arc<RecordingEngine> {
        &self.engine
    }

    /// Parse and apply every command in `reader`
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<ReplaySummary, ReplayError> {
        let mut summary = ReplaySummary::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let command: Command =
                serde_json::from_str(trimmed).map_err(|source| ReplayError::Parse {
                    line: index + 1,
                    source,
                })?;

            summary.commands += 1;
            if let Err(e) = self.apply(command) {
                warn!(line = index + 1, error = %e, "Command rejected");
                summary.rejected += 1;
            }
        }

        Ok(summary)
    }

    pub fn apply(&mut self, command: Command) -> Result<(), ManagerError> {
        match command {
            Command::Progress { id, percent } => {
                self.relay.on_progress(&id, percent);
            }
            Command::ProgressBytes {
                id,
                sent_bytes,
                total_bytes,
            } => match percent_of(sent_bytes, total_bytes) {
                Some(percent) => {
                    self.relay.on_progress(&id, percent);
                }
                None => debug!(upload.id = %id, sent_bytes, "Total size unknown, no progress event"),
            },
            Command::Error {
                id,
                response_code,
                response_body,
                message,
            } => {
                let response = response_code
                    .map(|code| ServerResponse::new(code, response_body.unwrap_or_default()));
                self.relay.on_error(&id, response, message.as_deref());
            }
            Command::Completed {
                id,
                response_code,
                response_body,
            } => {
                self.relay
                    .on_completed(&id, ServerResponse::new(response_code, response_body));
            }
            Command::Cancelled { id } => {
                self.relay.on_cancelled(&id);
            }
            Command::Register => self.relay.register(self.sink.clone()),
            Command::Unregister => {
                self.relay.unregister();
            }
            Command::DropOwner => {
                self.manager = None;
                info!("Queue owner dropped");
            }
            Command::Enqueue { options } => {
                let id = self.owner()?.add_to_upload_queue(&options)?;
                info!(upload.id = %id, "enqueue");
            }
            Command::Start { options } => {
                let id = self.owner()?.start_upload(&options)?;
                info!(upload.id = %id, "start");
            }
            Command::Cancel { id } => self.owner()?.cancel_upload(&id)?,
            Command::CancelAll => self.owner()?.cancel_all_uploads()?,
            Command::Clear => self.owner()?.clear_upload_queue(),
        }
        Ok(())
    }

    fn owner(&self) -> Result<&Arc<UploadManager>, ManagerError> {
        self.manager.as_ref().ok_or_else(|| {
            ManagerError::Engine(EngineError::Unavailable("queue owner dropped".into()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn replay() -> (Replay, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (Replay::new(&Config::default(), sink.clone()), sink)
    }

    #[test]
    fn test_parse_commands() {
        let cmd: Command =
            serde_json::from_str(r#"{"op":"error","id":"A","responseCode":500}"#).unwrap();
        assert!(matches!(
            cmd,
            Command::Error { response_code: Some(500), message: None, .. }
        ));

        let cmd: Command = serde_json::from_str(r#"{"op":"cancel_all"}"#).unwrap();
        assert!(matches!(cmd, Command::CancelAll));
    }

    #[test]
    fn test_run_skips_comments_and_counts() {
        let (mut replay, sink) = replay();
        let script = r#"
# queue two uploads
{"op":"enqueue","options":{"url":"https://example.com/u","path":"/tmp/a","customUploadId":"A"}}
{"op":"enqueue","options":{"url":"https://example.com/u","path":"/tmp/b","customUploadId":"B"}}
{"op":"progress","id":"A","percent":50}
{"op":"completed","id":"A","responseCode":200,"responseBody":"ok"}
"#;
        let summary = replay.run(script.as_bytes()).unwrap();

        assert_eq!(summary, ReplaySummary { commands: 4, rejected: 0 });
        assert_eq!(replay.engine().started(), vec!["A", "B"]);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_progress_bytes_converted_to_percent() {
        let (mut replay, sink) = replay();
        let script = r#"
{"op":"progress_bytes","id":"A","sentBytes":256,"totalBytes":1024}
{"op":"progress_bytes","id":"A","sentBytes":10,"totalBytes":0}
{"op":"progress_bytes","id":"A","sentBytes":1024,"totalBytes":1024}
"#;
        let summary = replay.run(script.as_bytes()).unwrap();

        assert_eq!(summary, ReplaySummary { commands: 3, rejected: 0 });
        let progress: Vec<_> = sink.events().iter().map(|e| e.record.progress).collect();
        assert_eq!(progress, vec![Some(25), Some(100)]);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let (mut replay, _) = replay();
        let err = replay.run("\n{\"op\":\"nope\"}\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReplayError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_operations_after_drop_owner_are_rejected() {
        let (mut replay, _) = replay();
        let script = r#"
{"op":"drop_owner"}
{"op":"clear"}
{"op":"cancelled","id":"A"}
"#;
        let summary = replay.run(script.as_bytes()).unwrap();
        assert_eq!(summary.rejected, 1);
        assert!(replay.manager().is_none());
    }
}
