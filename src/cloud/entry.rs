//! Values produced by the scoped file browser.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use super::CloudError;

/// One filesystem object inside a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes, `None` for directories.
    pub size: Option<u64>,
    /// Last modified timestamp.
    pub modified: DateTime<Utc>,
    /// Path relative to the storage root, `/`-separated.
    pub path: String,
}

/// One navigation segment of the current path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

/// Result of listing a directory.
#[derive(Debug, Clone)]
pub struct Listing {
    /// Children, directories first, then by case-insensitive name.
    pub entries: Vec<DirectoryEntry>,
    pub breadcrumbs: Vec<Breadcrumb>,
    /// Parent of the listed directory relative to the root, empty at the root.
    pub parent_path: String,
    /// The logical path that was listed.
    pub current_path: String,
    /// The user's storage root.
    pub root_path: String,
    pub disk_partitions: Vec<String>,
}

/// A file received for upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name supplied by the client.
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// What happened to a single uploaded file.
#[derive(Debug)]
pub enum UploadStatus {
    /// Written to disk.
    Stored { size: u64 },
    /// Skipped; the rest of the batch went on.
    Failed(CloudError),
}

/// Per-file upload result.
#[derive(Debug)]
pub struct UploadOutcome {
    /// Name the file was stored under (or was supplied with, on failure).
    pub name: String,
    pub status: UploadStatus,
}

impl UploadOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self.status, UploadStatus::Stored { .. })
    }
}

/// Result of a delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Parent of the deleted path, relative to the root.
    pub parent_path: String,
    /// `false` when there was nothing to delete.
    pub removed: bool,
}

/// A file read for download.
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// A user's effective storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub root_path: PathBuf,
    /// Whether the user mounted this root themselves.
    pub is_custom: bool,
}
