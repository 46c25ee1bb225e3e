//! Per-user scoped cloud disk.
//!
//! Every user browses a storage root: either a directory they mounted
//! themselves or the configured default root. All paths handed in by
//! clients are logical, forward-slash paths relative to that root and are
//! resolved and checked before any filesystem call is made.

mod browser;
mod entry;
mod error;
mod path;

pub use browser::ScopedFileBrowser;
pub use entry::{
    Breadcrumb, DeleteOutcome, DirectoryEntry, Download, Listing, MountInfo, UploadOutcome,
    UploadStatus, UploadedFile,
};
pub use error::CloudError;

/// Names never listed and never deleted.
pub const RESERVED_NAMES: &[&str] = &[
    "$RECYCLE.BIN",
    "System Volume Information",
    "pagefile.sys",
    "hiberfil.sys",
    "swapfile.sys",
];

/// Names never served by download.
pub const DOWNLOAD_RESERVED_NAMES: &[&str] = &["pagefile.sys", "hiberfil.sys", "swapfile.sys"];

/// Check whether a file or directory name is reserved.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Disk partitions a user may choose a mount root from.
///
/// Drive letters that exist on Windows, `/` everywhere else.
pub fn disk_partitions() -> Vec<String> {
    #[cfg(windows)]
    {
        (b'A'..=b'Z')
            .map(|letter| format!("{}:\\", letter as char))
            .filter(|drive| std::path::Path::new(drive).exists())
            .collect()
    }
    #[cfg(not(windows))]
    {
        vec!["/".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_reserved() {
        assert!(is_reserved("pagefile.sys"));
        assert!(is_reserved("System Volume Information"));
        assert!(!is_reserved("PAGEFILE.SYS"));
        assert!(!is_reserved("notes.txt"));
    }

    #[test]
    fn test_download_reserved_subset() {
        for name in DOWNLOAD_RESERVED_NAMES {
            assert!(is_reserved(name));
        }
    }

    #[cfg(not(windows))]
    #[test]
    fn test_disk_partitions_unix() {
        assert_eq!(disk_partitions(), vec!["/".to_string()]);
    }
}
