//! Upload Relay Library
//!
//! Relays lifecycle events from a background upload engine to an event sink
//! and drains a single-concurrency upload queue.
//!
//! # Features
//!
//! - **Event Relay**: progress, error, completed and cancelled callbacks are
//!   normalized into flat records and emitted under a namespaced event name
//! - **Queue Advancement**: every terminal event removes the upload from the
//!   queue and starts the next one, at most one upload active at a time
//! - **Weak Ownership**: the relay never keeps the queue owner alive
//! - **Detachable Sink**: events without a listener are dropped with a warning
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use upload_relay::{config::Config, relay::EventRelay, sink::BroadcastSink};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("relay.yaml")?;
//!     let relay = EventRelay::new(&config);
//!     let sink = BroadcastSink::new(config.events.channel_capacity);
//!     let mut events = sink.subscribe();
//!     relay.register(Arc::new(sink));
//!
//!     relay.on_progress("upload-1", 25);
//!     println!("{:?}", events.recv().await?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod event;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod queue;
pub mod relay;
pub mod replay;
pub mod sink;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use event::{EventKind, EventRecord, ServerResponse, UploadEvent};
pub use manager::UploadManager;
pub use relay::EventRelay;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
