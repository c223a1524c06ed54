//! File information lookup
//!
//! Reports name, existence, size, extension and a guessed MIME type for a
//! local path before it is handed to an upload.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fallback for unknown or missing extensions
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Result of [`get_file_info`]
///
/// `size` and `mime_type` are only filled in for existing regular files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Inspect `path`; a missing file is reported, not an error
pub fn get_file_info<P: AsRef<Path>>(path: P) -> FileInfo {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .filter(|e| !e.is_empty());

    let metadata = match std::fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => {
            tracing::debug!(path = %path.display(), "Path is not a regular file");
            return FileInfo {
                name,
                exists: false,
                size: None,
                extension,
                mime_type: None,
            };
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "File not accessible");
            return FileInfo {
                name,
                exists: false,
                size: None,
                extension,
                mime_type: None,
            };
        }
    };

    let mime_type = mime_type_for(extension.as_deref());
    FileInfo {
        name,
        exists: true,
        size: Some(metadata.len()),
        extension,
        mime_type: Some(mime_type),
    }
}

/// MIME type for a file extension, case-insensitive
pub fn mime_type_for(extension: Option<&str>) -> String {
    match extension {
        Some(ext) => mime_guess::from_ext(ext)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
        None => DEFAULT_MIME_TYPE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.MP4");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0u8; 2048]).unwrap();

        let info = get_file_info(&path);
        assert!(info.exists);
        assert_eq!(info.name, "clip.MP4");
        assert_eq!(info.size, Some(2048));
        assert_eq!(info.extension.as_deref(), Some("MP4"));
        assert_eq!(info.mime_type.as_deref(), Some("video/mp4"));
    }

    #[test]
    fn test_missing_file() {
        let info = get_file_info("/definitely/not/here/report.pdf");
        assert!(!info.exists);
        assert_eq!(info.name, "report.pdf");
        assert_eq!(info.extension.as_deref(), Some("pdf"));
        assert!(info.size.is_none());
        assert!(info.mime_type.is_none());
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let info = get_file_info(dir.path());
        assert!(!info.exists);
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        assert_eq!(mime_type_for(Some("qqzzunknown")), DEFAULT_MIME_TYPE);
        assert_eq!(mime_type_for(None), DEFAULT_MIME_TYPE);
        assert_eq!(mime_type_for(Some("JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Some("pdf")), "application/pdf");
    }
}
