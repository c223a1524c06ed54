//! Metrics module
//!
//! Prometheus counters for relayed events and queue activity.

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};

lazy_static! {
    // Event metrics
    pub static ref EVENTS_EMITTED: CounterVec = register_counter_vec!(
        "upload_relay_events_emitted_total",
        "Events delivered to the attached sink",
        &["kind"]
    ).unwrap();

    pub static ref EVENTS_DROPPED: CounterVec = register_counter_vec!(
        "upload_relay_events_dropped_total",
        "Events that could not be delivered",
        &["kind", "reason"]  // "detached" or "sink_error"
    ).unwrap();

    // Queue metrics
    pub static ref QUEUE_ADVANCES: CounterVec = register_counter_vec!(
        "upload_relay_queue_advances_total",
        "Queue advancement attempts after terminal events",
        &["outcome"]  // "advanced" or "owner_detached"
    ).unwrap();

    pub static ref UPLOADS_STARTED: CounterVec = register_counter_vec!(
        "upload_relay_uploads_started_total",
        "Uploads handed to the engine",
        &["source", "status"]
    ).unwrap();
}

/// Record an event delivered to the sink
pub fn record_event_emitted(kind: &str) {
    EVENTS_EMITTED.with_label_values(&[kind]).inc();
}

/// Record an event dropped before or during delivery
pub fn record_event_dropped(kind: &str, reason: &str) {
    EVENTS_DROPPED.with_label_values(&[kind, reason]).inc();
}

/// Record the outcome of a queue advance
pub fn record_queue_advance(outcome: &str) {
    QUEUE_ADVANCES.with_label_values(&[outcome]).inc();
}

/// Record an engine start
///
/// # Arguments
/// * `source` - `"queue"` or `"direct"`
/// * `success` - Whether the engine accepted the upload
pub fn record_upload_start(source: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    UPLOADS_STARTED.with_label_values(&[source, status]).inc();
}

/// Render the default registry in the Prometheus text format
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
