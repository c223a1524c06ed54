//! Upload options
//!
//! `UploadOptions` is what a caller hands over (camelCase JSON, the shape the
//! host runtime sends). `resolve` checks it and fills in configured defaults,
//! producing the `UploadRequest` that is queued and passed to the engine.
//!
//! # Example
//!
//! ```
//! use upload_relay::config::UploadDefaults;
//! use upload_relay::upload::{UploadKind, UploadOptions};
//!
//! let options: UploadOptions = serde_json::from_str(
//!     r#"{"url": "https://example.com/upload", "path": "/tmp/a.mp4", "type": "multipart", "field": "file"}"#,
//! ).unwrap();
//! let request = options.resolve(&UploadDefaults::default(), "upload-1").unwrap();
//! assert_eq!(request.method, "POST");
//! assert!(matches!(request.kind, UploadKind::Multipart { .. }));
//! ```

use crate::config::UploadDefaults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Option validation errors
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("Missing '{0}' field.")]
    MissingField(&'static str),

    #[error("Invalid url '{0}': must start with http:// or https://")]
    InvalidUrl(String),

    #[error("Invalid method '{0}': must be POST or PUT")]
    InvalidMethod(String),

    #[error("field is required field for multipart type.")]
    MissingMultipartField,

    #[error("Parameters supported only in multipart type")]
    ParametersRequireMultipart,

    #[error("Malformed upload options: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Request body encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadType {
    #[default]
    Raw,
    Multipart,
}

/// Tray notification options; every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub enabled: Option<bool>,
    pub enable_ring_tone: Option<bool>,
    pub auto_clear: Option<bool>,
    pub notification_channel: Option<String>,
    pub on_progress_title: Option<String>,
    pub on_progress_message: Option<String>,
    pub on_complete_title: Option<String>,
    pub on_complete_message: Option<String>,
    pub on_error_title: Option<String>,
    pub on_error_message: Option<String>,
    pub on_cancelled_title: Option<String>,
    pub on_cancelled_message: Option<String>,
}

/// Caller-supplied upload options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOptions {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub path: String,
    pub method: Option<String>,
    #[serde(default, rename = "type")]
    pub upload_type: UploadType,
    pub field: Option<String>,
    pub custom_upload_id: Option<String>,
    pub parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub notification: Option<NotificationOptions>,
    pub max_retries: Option<u32>,
    pub follow_redirects: Option<bool>,
    pub follow_ssl_redirects: Option<bool>,
    pub retry_on_connection_failure: Option<bool>,
    /// Seconds
    pub connect_timeout: Option<u64>,
    /// Seconds
    pub write_timeout: Option<u64>,
    /// Seconds
    pub read_timeout: Option<u64>,
}

impl UploadOptions {
    pub fn new(url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, OptionsError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Validate and apply defaults, binding the request to `upload_id`
    pub fn resolve(
        &self,
        defaults: &UploadDefaults,
        upload_id: impl Into<String>,
    ) -> Result<UploadRequest, OptionsError> {
        if self.url.is_empty() {
            return Err(OptionsError::MissingField("url"));
        }
        if self.path.is_empty() {
            return Err(OptionsError::MissingField("path"));
        }
        if !is_valid_http_url(&self.url) {
            return Err(OptionsError::InvalidUrl(self.url.clone()));
        }

        let method = self
            .method
            .as_deref()
            .unwrap_or(&defaults.method)
            .to_ascii_uppercase();
        if method != "POST" && method != "PUT" {
            return Err(OptionsError::InvalidMethod(method));
        }

        let kind = match self.upload_type {
            UploadType::Raw => {
                if self.parameters.is_some() {
                    return Err(OptionsError::ParametersRequireMultipart);
                }
                UploadKind::Raw
            }
            UploadType::Multipart => {
                let field = self
                    .field
                    .as_ref()
                    .filter(|f| !f.is_empty())
                    .ok_or(OptionsError::MissingMultipartField)?;
                UploadKind::Multipart {
                    field: field.clone(),
                    parameters: self.parameters.clone().unwrap_or_default(),
                }
            }
        };

        let http = HttpSettings {
            follow_redirects: self.follow_redirects.unwrap_or(defaults.follow_redirects),
            follow_ssl_redirects: self
                .follow_ssl_redirects
                .unwrap_or(defaults.follow_ssl_redirects),
            retry_on_connection_failure: self
                .retry_on_connection_failure
                .unwrap_or(defaults.retry_on_connection_failure),
            connect_timeout: self
                .connect_timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| defaults.connect_timeout()),
            write_timeout: self
                .write_timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| defaults.write_timeout()),
            read_timeout: self
                .read_timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| defaults.read_timeout()),
        };

        Ok(UploadRequest {
            id: upload_id.into(),
            url: self.url.clone(),
            path: self.path.clone(),
            method,
            kind,
            headers: self.headers.clone(),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            http,
            notification: resolve_notification(self.notification.as_ref(), defaults),
        })
    }
}

fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn resolve_notification(
    options: Option<&NotificationOptions>,
    defaults: &UploadDefaults,
) -> Option<NotificationSettings> {
    let fallback = NotificationOptions::default();
    let n = options.unwrap_or(&fallback);
    if !n.enabled.unwrap_or(true) {
        return None;
    }

    let auto_clear = n.auto_clear.unwrap_or(false);
    let text = |value: &Option<String>| value.clone().unwrap_or_default();

    Some(NotificationSettings {
        channel_id: n
            .notification_channel
            .clone()
            .unwrap_or_else(|| defaults.notification_channel.clone()),
        ring_tone: n.enable_ring_tone.unwrap_or(false),
        progress: StatusText {
            title: text(&n.on_progress_title),
            message: text(&n.on_progress_message),
            auto_clear: false,
        },
        success: StatusText {
            title: text(&n.on_complete_title),
            message: text(&n.on_complete_message),
            auto_clear,
        },
        error: StatusText {
            title: text(&n.on_error_title),
            message: text(&n.on_error_message),
            auto_clear,
        },
        cancelled: StatusText {
            title: text(&n.on_cancelled_title),
            message: text(&n.on_cancelled_message),
            auto_clear,
        },
    })
}

/// How the file travels in the request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UploadKind {
    Raw,
    Multipart {
        field: String,
        parameters: BTreeMap<String, String>,
    },
}

/// Transport settings the engine should apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    pub follow_redirects: bool,
    pub follow_ssl_redirects: bool,
    pub retry_on_connection_failure: bool,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub read_timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusText {
    pub title: String,
    pub message: String,
    pub auto_clear: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub channel_id: String,
    pub ring_tone: bool,
    pub progress: StatusText,
    pub success: StatusText,
    pub error: StatusText,
    pub cancelled: StatusText,
}

/// A validated upload, ready for the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub id: String,
    pub url: String,
    pub path: String,
    pub method: String,
    pub kind: UploadKind,
    pub headers: BTreeMap<String, String>,
    pub max_retries: u32,
    pub http: HttpSettings,
    /// `None` when notifications are disabled
    pub notification: Option<NotificationSettings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> UploadDefaults {
        UploadDefaults::default()
    }

    #[test]
    fn test_raw_defaults() {
        let options = UploadOptions::new("https://example.com/u", "/tmp/file.bin");
        let request = options.resolve(&defaults(), "id-1").unwrap();

        assert_eq!(request.id, "id-1");
        assert_eq!(request.method, "POST");
        assert_eq!(request.kind, UploadKind::Raw);
        assert_eq!(request.max_retries, 2);
        assert!(request.http.follow_redirects);
        assert_eq!(request.http.connect_timeout, Duration::from_secs(30));
        assert_eq!(request.http.write_timeout, Duration::from_secs(60));

        let notification = request.notification.unwrap();
        assert_eq!(notification.channel_id, "BackgroundUploadChannel");
        assert!(!notification.success.auto_clear);
    }

    #[test]
    fn test_missing_url() {
        let options = UploadOptions::new("", "/tmp/file.bin");
        let err = options.resolve(&defaults(), "id").unwrap_err();
        assert!(matches!(err, OptionsError::MissingField("url")));
        assert_eq!(err.to_string(), "Missing 'url' field.");
    }

    #[test]
    fn test_missing_path() {
        let options = UploadOptions::new("https://example.com", "");
        assert!(matches!(
            options.resolve(&defaults(), "id"),
            Err(OptionsError::MissingField("path"))
        ));
    }

    #[test]
    fn test_non_http_url_rejected() {
        let options = UploadOptions::new("ftp://example.com", "/tmp/f");
        assert!(matches!(
            options.resolve(&defaults(), "id"),
            Err(OptionsError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_method_is_normalized() {
        let mut options = UploadOptions::new("https://example.com", "/tmp/f");
        options.method = Some("put".into());
        assert_eq!(options.resolve(&defaults(), "id").unwrap().method, "PUT");

        options.method = Some("GET".into());
        assert!(matches!(
            options.resolve(&defaults(), "id"),
            Err(OptionsError::InvalidMethod(_))
        ));
    }

    #[test]
    fn test_multipart_requires_field() {
        let mut options = UploadOptions::new("https://example.com", "/tmp/f");
        options.upload_type = UploadType::Multipart;
        assert!(matches!(
            options.resolve(&defaults(), "id"),
            Err(OptionsError::MissingMultipartField)
        ));
    }

    #[test]
    fn test_parameters_only_for_multipart() {
        let mut params = BTreeMap::new();
        params.insert("album".to_string(), "summer".to_string());

        let mut options = UploadOptions::new("https://example.com", "/tmp/f");
        options.parameters = Some(params.clone());
        assert!(matches!(
            options.resolve(&defaults(), "id"),
            Err(OptionsError::ParametersRequireMultipart)
        ));

        options.upload_type = UploadType::Multipart;
        options.field = Some("file".into());
        let request = options.resolve(&defaults(), "id").unwrap();
        assert_eq!(
            request.kind,
            UploadKind::Multipart {
                field: "file".into(),
                parameters: params,
            }
        );
    }

    #[test]
    fn test_disabled_notification() {
        let options: UploadOptions = serde_json::from_value(serde_json::json!({
            "url": "https://example.com",
            "path": "/tmp/f",
            "notification": {"enabled": false}
        }))
        .unwrap();
        let request = options.resolve(&defaults(), "id").unwrap();
        assert!(request.notification.is_none());
    }

    #[test]
    fn test_camel_case_fields() {
        let options = UploadOptions::from_json(serde_json::json!({
            "url": "https://example.com",
            "path": "/tmp/f",
            "customUploadId": "mine",
            "maxRetries": 5,
            "readTimeout": 5,
            "notification": {"autoClear": true, "onCompleteTitle": "Done"}
        }))
        .unwrap();
        assert_eq!(options.custom_upload_id.as_deref(), Some("mine"));

        let request = options.resolve(&defaults(), "mine").unwrap();
        assert_eq!(request.max_retries, 5);
        assert_eq!(request.http.read_timeout, Duration::from_secs(5));
        let notification = request.notification.unwrap();
        assert_eq!(notification.success.title, "Done");
        assert!(notification.success.auto_clear);
        assert!(!notification.progress.auto_clear);
    }

    #[test]
    fn test_wrong_value_type_is_malformed() {
        let result = UploadOptions::from_json(serde_json::json!({
            "url": "https://example.com",
            "path": "/tmp/f",
            "headers": "not-a-map"
        }));
        assert!(matches!(result, Err(OptionsError::Malformed(_))));
    }
}
