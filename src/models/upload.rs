//! Uploaded file model
//!
//! One row per stored asset. Thumbnails are derived files; their location
//! is computed from the stored filename rather than kept as a separate row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix used for thumbnail filenames next to the original.
pub const THUMBNAIL_PREFIX: &str = "thumb_";

/// Metadata for a file stored by the image pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Unique identifier
    pub id: i64,
    /// Generated unique filename on disk
    pub filename: String,
    /// Filename as supplied by the uploader
    pub original_filename: Option<String>,
    /// Full path of the stored file
    pub filepath: String,
    /// Size in bytes of the stored (processed) file
    pub file_size: Option<i64>,
    /// MIME type derived from the extension
    pub mime_type: Option<String>,
    /// Uploading user ID
    pub uploaded_by: Option<i64>,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedFile {
    /// Compute the sibling thumbnail path for this file.
    ///
    /// The thumbnail may not exist; callers decide whether to check.
    pub fn thumbnail_path(&self) -> PathBuf {
        thumbnail_path_for(&self.filepath)
    }
}

/// Sibling thumbnail path for any stored file path.
pub fn thumbnail_path_for(filepath: impl AsRef<std::path::Path>) -> PathBuf {
    let path = filepath.as_ref();
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.parent() {
        Some(parent) => parent.join(format!("{}{}", THUMBNAIL_PREFIX, filename)),
        None => PathBuf::from(format!("{}{}", THUMBNAIL_PREFIX, filename)),
    }
}
