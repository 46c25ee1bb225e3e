//! Error taxonomy for the cloud disk.

use std::io;

use thiserror::Error;

/// Errors returned by the scoped file browser.
///
/// Messages never carry OS error text.
#[derive(Debug, Error)]
pub enum CloudError {
    /// The path escapes the storage root or names a reserved entry.
    #[error("access denied: {0}")]
    PathDenied(String),

    /// The target does not exist.
    #[error("path not found: {0}")]
    NotFound(String),

    /// The operating system refused access.
    #[error("permission denied")]
    PermissionDenied,

    /// The operating system hit a resource limit (disk full, path too long, ...).
    #[error("system limit reached")]
    SystemLimit,

    /// Any other failure.
    #[error("operation failed")]
    OperationFailed,
}

impl CloudError {
    /// Classify an I/O error from a filesystem call.
    pub fn from_io(err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            CloudError::PermissionDenied
        } else if err.raw_os_error().is_some() {
            CloudError::SystemLimit
        } else {
            CloudError::OperationFailed
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CloudError::PathDenied(_) => "path_denied",
            CloudError::NotFound(_) => "not_found",
            CloudError::PermissionDenied => "permission_denied",
            CloudError::SystemLimit => "system_limit",
            CloudError::OperationFailed => "operation_failed",
        }
    }
}
