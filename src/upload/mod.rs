//! Upload module
//!
//! Caller-facing upload options, the validated request handed to the engine,
//! and the engine seam itself. Transport, retries and multipart encoding live
//! behind [`UploadEngine`].

use thiserror::Error;

pub mod file_info;
pub mod options;

pub use file_info::{get_file_info, FileInfo};
pub use options::{
    HttpSettings, NotificationOptions, NotificationSettings, OptionsError, StatusText,
    UploadKind, UploadOptions, UploadRequest, UploadType,
};

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Unknown upload: {0}")]
    UnknownUpload(String),

    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

/// Background upload engine
///
/// The engine executes uploads on its own threads and reports back through
/// the [`EventRelay`](crate::relay::EventRelay) callbacks. It may call those
/// callbacks synchronously from inside `start`.
#[cfg_attr(test, mockall::automock)]
pub trait UploadEngine: Send + Sync {
    /// Begin executing `request`; the engine reports under `request.id`
    fn start(&self, request: &UploadRequest) -> Result<(), EngineError>;

    /// Stop one upload; the engine later reports it as cancelled
    fn stop(&self, upload_id: &str) -> Result<(), EngineError>;

    /// Stop every upload the engine is running
    fn stop_all(&self) -> Result<(), EngineError>;
}
