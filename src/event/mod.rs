//! Upload lifecycle events
//!
//! Normalized events built from engine callbacks and the flat record shape
//! handed to an [`EventSink`](crate::sink::EventSink).
//!
//! # Wire shape
//!
//! ```text
//! RNUploadManager-progress   {"id":"A","progress":42}
//! RNUploadManager-error      {"id":"A","responseCode":500,"responseBody":"..","error":"boom"}
//! RNUploadManager-completed  {"id":"A","responseCode":200,"responseBody":"ok"}
//! RNUploadManager-cancelled  {"id":"A"}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace token prefixed to every event name
pub const DEFAULT_NAMESPACE: &str = "RNUploadManager";

/// Message used when an error callback carries no underlying cause
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown exception";

/// Event kind, also the suffix of the emitted event name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Progress,
    Error,
    Completed,
    Cancelled,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Progress,
        EventKind::Error,
        EventKind::Completed,
        EventKind::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Progress => "progress",
            EventKind::Error => "error",
            EventKind::Completed => "completed",
            EventKind::Cancelled => "cancelled",
        }
    }

    /// Error, completed and cancelled end an upload's active lifecycle
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EventKind::Progress)
    }

    /// Full event name, e.g. `RNUploadManager-progress`
    pub fn event_name(&self, namespace: &str) -> String {
        format!("{}-{}", namespace, self.as_str())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP response reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    pub code: i32,
    pub body: String,
}

impl ServerResponse {
    pub fn new(code: i32, body: impl Into<String>) -> Self {
        Self {
            code,
            body: body.into(),
        }
    }
}

/// One lifecycle event for a single upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Progress {
        upload_id: String,
        percent: u8,
    },
    Error {
        upload_id: String,
        response: Option<ServerResponse>,
        message: String,
    },
    Completed {
        upload_id: String,
        response: ServerResponse,
    },
    Cancelled {
        upload_id: String,
    },
}

impl UploadEvent {
    /// Progress event; percentages above 100 clamp to 100
    pub fn progress(upload_id: impl Into<String>, percent: u32) -> Self {
        UploadEvent::Progress {
            upload_id: upload_id.into(),
            percent: percent.min(100) as u8,
        }
    }

    /// Error event with the placeholder message substituted when absent
    pub fn error(
        upload_id: impl Into<String>,
        response: Option<ServerResponse>,
        message: Option<&str>,
    ) -> Self {
        UploadEvent::Error {
            upload_id: upload_id.into(),
            response,
            message: message.unwrap_or(UNKNOWN_ERROR_MESSAGE).to_string(),
        }
    }

    pub fn completed(upload_id: impl Into<String>, response: ServerResponse) -> Self {
        UploadEvent::Completed {
            upload_id: upload_id.into(),
            response,
        }
    }

    pub fn cancelled(upload_id: impl Into<String>) -> Self {
        UploadEvent::Cancelled {
            upload_id: upload_id.into(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            UploadEvent::Progress { .. } => EventKind::Progress,
            UploadEvent::Error { .. } => EventKind::Error,
            UploadEvent::Completed { .. } => EventKind::Completed,
            UploadEvent::Cancelled { .. } => EventKind::Cancelled,
        }
    }

    pub fn upload_id(&self) -> &str {
        match self {
            UploadEvent::Progress { upload_id, .. }
            | UploadEvent::Error { upload_id, .. }
            | UploadEvent::Completed { upload_id, .. }
            | UploadEvent::Cancelled { upload_id } => upload_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// Flatten into the key/value record delivered to sinks
    pub fn to_record(&self) -> EventRecord {
        let mut record = EventRecord::new(self.upload_id());
        match self {
            UploadEvent::Progress { percent, .. } => {
                record.progress = Some(*percent);
            }
            UploadEvent::Error {
                response, message, ..
            } => {
                if let Some(response) = response {
                    record.response_code = Some(response.code);
                    record.response_body = Some(response.body.clone());
                }
                record.error = Some(message.clone());
            }
            UploadEvent::Completed { response, .. } => {
                record.response_code = Some(response.code);
                record.response_body = Some(response.body.clone());
            }
            UploadEvent::Cancelled { .. } => {}
        }
        record
    }
}

/// Flat payload keyed by `id`, `progress`, `responseCode`, `responseBody`, `error`
///
/// Absent fields are omitted from the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EventRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Integer percentage of `sent` over `total`, or `None` when the total is unknown
pub fn percent_of(sent: u64, total: u64) -> Option<u32> {
    if total == 0 {
        return None;
    }
    let pct = (sent.min(total) as u128 * 100) / total as u128;
    Some(pct as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name_uses_namespace() {
        assert_eq!(
            EventKind::Progress.event_name(DEFAULT_NAMESPACE),
            "RNUploadManager-progress"
        );
        assert_eq!(EventKind::Cancelled.event_name("app"), "app-cancelled");
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(!EventKind::Progress.is_terminal());
        assert!(EventKind::Error.is_terminal());
        assert!(EventKind::Completed.is_terminal());
        assert!(EventKind::Cancelled.is_terminal());
    }

    #[test]
    fn test_progress_clamps_to_100() {
        let event = UploadEvent::progress("A", 250);
        assert_eq!(event.to_record().progress, Some(100));
    }

    #[test]
    fn test_error_without_cause_uses_placeholder() {
        let record = UploadEvent::error("A", None, None).to_record();
        assert_eq!(record.error.as_deref(), Some(UNKNOWN_ERROR_MESSAGE));
        assert!(record.response_code.is_none());
        assert!(record.response_body.is_none());
    }

    #[test]
    fn test_error_with_response_fills_both_fields() {
        let response = ServerResponse::new(503, "unavailable");
        let record = UploadEvent::error("A", Some(response), Some("server down")).to_record();
        assert_eq!(record.response_code, Some(503));
        assert_eq!(record.response_body.as_deref(), Some("unavailable"));
        assert_eq!(record.error.as_deref(), Some("server down"));
    }

    #[test]
    fn test_record_omits_absent_fields() {
        let json = serde_json::to_value(UploadEvent::cancelled("A").to_record()).unwrap();
        assert_eq!(json, serde_json::json!({"id": "A"}));

        let json = serde_json::to_value(
            UploadEvent::completed("A", ServerResponse::new(200, "ok")).to_record(),
        )
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "A", "responseCode": 200, "responseBody": "ok"})
        );
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(50, 200), Some(25));
        assert_eq!(percent_of(10, 0), None);
        assert_eq!(percent_of(300, 200), Some(100));
    }
}
