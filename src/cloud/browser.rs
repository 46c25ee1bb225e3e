//! Scoped file browser.
//!
//! Resolves logical paths against a user's storage root and performs
//! listing and mutations only inside that boundary.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, warn};

use super::entry::{
    Breadcrumb, DeleteOutcome, DirectoryEntry, Download, Listing, MountInfo, UploadOutcome,
    UploadStatus, UploadedFile,
};
use super::path::{decode, is_single_component, normalize, relative_slash, sanitize_file_name};
use super::{disk_partitions, is_reserved, CloudError, DOWNLOAD_RESERVED_NAMES};
use crate::config::{CloudConfig, ConfinementPolicy};
use crate::db::{DbPool, StorageRootRepository};

/// When the containment check applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Containment {
    /// Follow the configured policy.
    Policy,
    /// Check regardless of policy.
    Always,
}

/// A user's storage root, normalized.
struct Scope {
    root: PathBuf,
    is_custom: bool,
}

/// Per-user file browser confined to a storage root.
#[derive(Debug, Clone)]
pub struct ScopedFileBrowser {
    pool: DbPool,
    default_root: PathBuf,
    policy: ConfinementPolicy,
    mount_allowlist: Vec<PathBuf>,
}

impl ScopedFileBrowser {
    /// Create a browser with the given default root and strict confinement.
    pub fn new(pool: DbPool, default_root: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            default_root: default_root.into(),
            policy: ConfinementPolicy::Strict,
            mount_allowlist: Vec::new(),
        }
    }

    /// Create a browser from the `[cloud]` configuration section.
    pub fn from_config(pool: DbPool, config: &CloudConfig) -> Self {
        Self::new(pool, &config.default_root)
            .with_policy(config.confinement)
            .with_mount_allowlist(config.mount_allowlist.iter().map(PathBuf::from).collect())
    }

    /// Set the confinement policy.
    pub fn with_policy(mut self, policy: ConfinementPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Restrict mountable roots to these directories. Empty allows any path.
    pub fn with_mount_allowlist(mut self, allowlist: Vec<PathBuf>) -> Self {
        self.mount_allowlist = allowlist;
        self
    }

    /// The root used by users who have not mounted their own.
    pub fn default_root(&self) -> &Path {
        &self.default_root
    }

    async fn scope(&self, user: &str) -> Result<Scope, CloudError> {
        let stored = StorageRootRepository::new(&self.pool)
            .get(user)
            .await
            .map_err(|e| {
                warn!(user = %user, error = %e, "Failed to look up storage root");
                CloudError::OperationFailed
            })?;

        let (raw, is_custom) = match stored {
            Some(root) => (PathBuf::from(root.root_path), true),
            None => (self.default_root.clone(), false),
        };

        let root = normalize(&raw).await.map_err(|e| {
            warn!(user = %user, root = %raw.display(), error = %e, "Storage root cannot be resolved");
            CloudError::PathDenied(raw.to_string_lossy().into_owned())
        })?;

        Ok(Scope { root, is_custom })
    }

    async fn resolve_in(
        &self,
        scope: &Scope,
        logical: &str,
        containment: Containment,
    ) -> Result<PathBuf, CloudError> {
        if logical.is_empty() {
            return Ok(scope.root.clone());
        }

        let decoded = decode(logical)?;
        let resolved = normalize(&scope.root.join(&decoded))
            .await
            .map_err(|_| CloudError::PathDenied(logical.to_string()))?;

        let enforce = match containment {
            Containment::Always => true,
            Containment::Policy => {
                !scope.is_custom || self.policy == ConfinementPolicy::Strict
            }
        };

        if enforce && !resolved.starts_with(&scope.root) {
            warn!(
                root = %scope.root.display(),
                path = %logical,
                "Path escapes storage root"
            );
            return Err(CloudError::PathDenied(logical.to_string()));
        }

        Ok(resolved)
    }

    /// Resolve a logical path to an absolute path for a user.
    pub async fn resolve(&self, user: &str, logical: &str) -> Result<PathBuf, CloudError> {
        let scope = self.scope(user).await?;
        self.resolve_in(&scope, logical, Containment::Policy).await
    }

    /// The user's effective storage root.
    pub async fn current_root(&self, user: &str) -> Result<MountInfo, CloudError> {
        let scope = self.scope(user).await?;
        Ok(MountInfo {
            root_path: scope.root,
            is_custom: scope.is_custom,
        })
    }

    /// List the immediate children of a directory.
    ///
    /// Fails with `NotFound` when the target does not exist. Any failure
    /// while reading the directory yields an empty listing instead.
    pub async fn list(&self, user: &str, logical: &str) -> Result<Listing, CloudError> {
        let scope = self.scope(user).await?;
        let target = self.resolve_in(&scope, logical, Containment::Policy).await?;

        if !fs::try_exists(&target).await.unwrap_or(false) {
            return Err(CloudError::NotFound(logical.to_string()));
        }

        let current_path = decode(logical)?;
        let mut listing = Listing {
            entries: Vec::new(),
            breadcrumbs: Vec::new(),
            parent_path: String::new(),
            current_path,
            root_path: scope.root.to_string_lossy().into_owned(),
            disk_partitions: disk_partitions(),
        };

        match read_listing(&scope.root, &target).await {
            Ok((entries, parent_path)) => {
                listing.entries = entries;
                listing.parent_path = parent_path;
                listing.breadcrumbs = breadcrumbs(&listing.current_path);
            }
            Err(e) => {
                warn!(
                    user = %user,
                    path = %target.display(),
                    error = %e,
                    "Directory listing failed, returning empty result"
                );
            }
        }

        Ok(listing)
    }

    /// Create `folder_name` inside the directory at `logical`.
    ///
    /// Succeeds without changes if the folder already exists.
    pub async fn create_folder(
        &self,
        user: &str,
        logical: &str,
        folder_name: &str,
    ) -> Result<(), CloudError> {
        if !is_single_component(folder_name) {
            return Err(CloudError::PathDenied(folder_name.to_string()));
        }

        let scope = self.scope(user).await?;
        let target = self.resolve_in(&scope, logical, Containment::Policy).await?;
        let folder = target.join(folder_name);

        match fs::create_dir(&folder).await {
            Ok(()) => {
                info!(user = %user, path = %folder.display(), "Folder created");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && folder.is_dir() => Ok(()),
            Err(e) => {
                warn!(user = %user, path = %folder.display(), error = %e, "Failed to create folder");
                Err(CloudError::from_io(&e))
            }
        }
    }

    /// Write a batch of files into the directory at `logical`.
    ///
    /// The directory is created if missing. Each file is written
    /// independently; a failed file is reported in its outcome and the rest
    /// of the batch continues. Only resolving or creating the directory
    /// fails the whole call.
    pub async fn upload(
        &self,
        user: &str,
        logical: &str,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<UploadOutcome>, CloudError> {
        let scope = self.scope(user).await?;
        let target = self.resolve_in(&scope, logical, Containment::Always).await?;

        fs::create_dir_all(&target).await.map_err(|e| {
            warn!(user = %user, path = %target.display(), error = %e, "Failed to create upload directory");
            CloudError::from_io(&e)
        })?;

        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let Some(name) = sanitize_file_name(&file.name) else {
                warn!(user = %user, name = %file.name, "Rejected upload with unusable file name");
                outcomes.push(UploadOutcome {
                    name: file.name.clone(),
                    status: UploadStatus::Failed(CloudError::PathDenied(file.name)),
                });
                continue;
            };

            // The name itself may be a symlink planted inside the root.
            let dest = match normalize(&target.join(name)).await {
                Ok(dest) if dest.starts_with(&scope.root) => dest,
                _ => {
                    warn!(user = %user, name = %name, "Rejected upload through a link leaving the root");
                    outcomes.push(UploadOutcome {
                        name: name.to_string(),
                        status: UploadStatus::Failed(CloudError::PathDenied(name.to_string())),
                    });
                    continue;
                }
            };
            let size = file.content.len() as u64;
            let status = match fs::write(&dest, &file.content).await {
                Ok(()) => {
                    debug!(user = %user, path = %dest.display(), size, "File stored");
                    UploadStatus::Stored { size }
                }
                Err(e) => {
                    warn!(
                        user = %user,
                        path = %dest.display(),
                        error = %e,
                        "Failed to store uploaded file"
                    );
                    UploadStatus::Failed(CloudError::from_io(&e))
                }
            };
            outcomes.push(UploadOutcome {
                name: name.to_string(),
                status,
            });
        }

        let stored = outcomes.iter().filter(|o| o.is_stored()).count();
        info!(
            user = %user,
            path = %target.display(),
            stored,
            failed = outcomes.len() - stored,
            "Upload finished"
        );

        Ok(outcomes)
    }

    /// Delete a file, or a directory with everything under it.
    ///
    /// Deleting something that does not exist succeeds and removes nothing.
    pub async fn delete(&self, user: &str, logical: &str) -> Result<DeleteOutcome, CloudError> {
        let scope = self.scope(user).await?;
        let target = self.resolve_in(&scope, logical, Containment::Policy).await?;

        if target == scope.root {
            return Err(CloudError::PathDenied(logical.to_string()));
        }

        let parent_path = target
            .parent()
            .and_then(|parent| relative_slash(parent, &scope.root))
            .unwrap_or_default();

        let metadata = match fs::metadata(&target).await {
            Ok(m) => m,
            Err(_) => {
                return Ok(DeleteOutcome {
                    parent_path,
                    removed: false,
                })
            }
        };

        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_reserved(&name) {
            return Err(CloudError::PathDenied(logical.to_string()));
        }

        let result = if metadata.is_dir() {
            fs::remove_dir_all(&target).await
        } else {
            fs::remove_file(&target).await
        };

        match result {
            Ok(()) => {
                info!(user = %user, path = %target.display(), "Deleted");
                Ok(DeleteOutcome {
                    parent_path,
                    removed: true,
                })
            }
            Err(e) => {
                warn!(user = %user, path = %target.display(), error = %e, "Delete failed");
                Err(CloudError::from_io(&e))
            }
        }
    }

    /// Read a file for download.
    pub async fn download(&self, user: &str, logical: &str) -> Result<Download, CloudError> {
        let scope = self.scope(user).await?;
        let target = self.resolve_in(&scope, logical, Containment::Always).await?;

        match fs::metadata(&target).await {
            Ok(m) if m.is_file() => {}
            _ => return Err(CloudError::NotFound(logical.to_string())),
        }

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if DOWNLOAD_RESERVED_NAMES.contains(&file_name.as_str()) {
            return Err(CloudError::PathDenied(logical.to_string()));
        }

        let content = fs::read(&target).await.map_err(|e| {
            warn!(user = %user, path = %target.display(), error = %e, "Failed to read file");
            CloudError::from_io(&e)
        })?;

        Ok(Download { file_name, content })
    }

    /// Point a user's storage root at another directory.
    ///
    /// A missing directory is created first; if that fails the previous
    /// root stays in place.
    pub async fn set_mount_path(&self, user: &str, new_root: &str) -> Result<PathBuf, CloudError> {
        let requested = new_root.trim();
        if requested.is_empty() {
            return Err(CloudError::PathDenied(String::new()));
        }

        let candidate = normalize(Path::new(requested))
            .await
            .map_err(|_| CloudError::PathDenied(requested.to_string()))?;

        if !self.mount_allowed(&candidate).await {
            warn!(user = %user, path = %candidate.display(), "Mount path outside allow-list");
            return Err(CloudError::PathDenied(requested.to_string()));
        }

        if !fs::try_exists(&candidate).await.unwrap_or(false) {
            fs::create_dir_all(&candidate).await.map_err(|e| {
                warn!(user = %user, path = %candidate.display(), error = %e, "Failed to create mount path");
                CloudError::from_io(&e)
            })?;
        }

        let root = normalize(&candidate)
            .await
            .map_err(|e| CloudError::from_io(&e))?;
        let root_str = root.to_string_lossy();

        StorageRootRepository::new(&self.pool)
            .set(user, &root_str)
            .await
            .map_err(|e| {
                warn!(user = %user, error = %e, "Failed to save storage root");
                CloudError::OperationFailed
            })?;

        info!(user = %user, root = %root_str, "Storage root changed");
        Ok(root)
    }

    async fn mount_allowed(&self, candidate: &Path) -> bool {
        if self.mount_allowlist.is_empty() {
            return true;
        }
        for allowed in &self.mount_allowlist {
            if let Ok(allowed) = normalize(allowed).await {
                if candidate.starts_with(&allowed) {
                    return true;
                }
            }
        }
        false
    }

    /// Check whether a path exists on the server.
    pub async fn validate_path(&self, path: &str) -> bool {
        let path = path.trim();
        !path.is_empty() && fs::try_exists(path).await.unwrap_or(false)
    }
}

/// Read the children of `target` and its parent path relative to `root`.
async fn read_listing(
    root: &Path,
    target: &Path,
) -> std::io::Result<(Vec<DirectoryEntry>, String)> {
    let outside = || std::io::Error::new(std::io::ErrorKind::Other, "path is outside storage root");

    let parent_path = if target == root {
        String::new()
    } else {
        target
            .parent()
            .and_then(|parent| relative_slash(parent, root))
            .ok_or_else(outside)?
    };

    let mut entries = Vec::new();
    let mut dir = fs::read_dir(target).await?;
    while let Some(item) = dir.next_entry().await? {
        let name = item.file_name().to_string_lossy().into_owned();
        if is_reserved(&name) {
            continue;
        }

        let item_path = item.path();
        let metadata = match fs::metadata(&item_path).await {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %item_path.display(), error = %e, "Skipping entry that cannot be read");
                continue;
            }
        };
        let modified: DateTime<Utc> = match metadata.modified() {
            Ok(t) => t.into(),
            Err(_) => continue,
        };

        let path = relative_slash(&item_path, root).ok_or_else(outside)?;
        let is_dir = metadata.is_dir();
        entries.push(DirectoryEntry {
            name,
            is_dir,
            size: (!is_dir).then(|| metadata.len()),
            modified,
            path,
        });
    }

    entries.sort_by_cached_key(|e| (!e.is_dir, e.name.to_lowercase()));

    Ok((entries, parent_path))
}

/// Navigation segments for a logical path.
/// One crumb per `/`-separated segment of the requested path, kept as
/// typed. An empty path has no crumbs.
fn breadcrumbs(logical: &str) -> Vec<Breadcrumb> {
    if logical.is_empty() {
        return Vec::new();
    }
    let parts: Vec<&str> = logical.split('/').collect();
    (0..parts.len())
        .map(|i| Breadcrumb {
            name: parts[i].to_string(),
            path: parts[..=i].join("/"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::fs as stdfs;
    use tempfile::TempDir;

    async fn setup() -> (Database, TempDir, ScopedFileBrowser) {
        let db = Database::open_in_memory().await.unwrap();
        let dir = TempDir::new().unwrap();
        let browser = ScopedFileBrowser::new(db.pool().clone(), dir.path());
        (db, dir, browser)
    }

    fn names(listing: &Listing) -> Vec<&str> {
        listing.entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_resolve_empty_is_root() {
        let (_db, dir, browser) = setup().await;

        let resolved = browser.resolve("alice", "").await.unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_rejects_escape() {
        let (_db, _dir, browser) = setup().await;

        for path in ["..", "../outside", "a/../../x", "%2e%2e/x", "/etc"] {
            let result = browser.resolve("alice", path).await;
            assert!(
                matches!(result, Err(CloudError::PathDenied(_))),
                "{path} should be denied"
            );
        }
    }

    #[tokio::test]
    async fn test_resolve_allows_inner_dotdot() {
        let (_db, dir, browser) = setup().await;

        let resolved = browser.resolve("alice", "docs/../photos").await.unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap().join("photos"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_rejects_symlink_escape() {
        let (_db, dir, browser) = setup().await;
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let result = browser.list("alice", "link").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
    }

    /// Root with `link` pointing at a separate directory holding `secret.txt`.
    #[cfg(unix)]
    fn link_outside(dir: &TempDir) -> TempDir {
        let outside = TempDir::new().unwrap();
        stdfs::write(outside.path().join("secret.txt"), "keep").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        outside
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_rejects_symlink_behind_missing_dir() {
        let (_db, dir, browser) = setup().await;
        let _outside = link_outside(&dir);

        for path in ["ghost/../link", "ghost/../link/secret.txt", "a/b/../../link/x"] {
            let result = browser.resolve("alice", path).await;
            assert!(
                matches!(result, Err(CloudError::PathDenied(_))),
                "{path} should be denied"
            );
        }
        assert!(matches!(
            browser.list("alice", "ghost/../link").await,
            Err(CloudError::PathDenied(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upload_through_symlink_behind_missing_dir_denied() {
        let (_db, dir, browser) = setup().await;
        let outside = link_outside(&dir);

        let result = browser
            .upload(
                "alice",
                "ghost/../link",
                vec![UploadedFile::new("secret.txt", "overwritten")],
            )
            .await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
        assert_eq!(
            stdfs::read_to_string(outside.path().join("secret.txt")).unwrap(),
            "keep"
        );
        assert!(!dir.path().join("ghost").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upload_onto_symlinked_name_denied() {
        let (_db, dir, browser) = setup().await;
        let outside = link_outside(&dir);
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("notes.txt"),
        )
        .unwrap();

        let outcomes = browser
            .upload(
                "alice",
                "",
                vec![
                    UploadedFile::new("notes.txt", "overwritten"),
                    UploadedFile::new("fine.txt", "ok"),
                ],
            )
            .await
            .unwrap();

        assert!(matches!(
            outcomes[0].status,
            UploadStatus::Failed(CloudError::PathDenied(_))
        ));
        assert!(outcomes[1].is_stored());
        assert_eq!(
            stdfs::read_to_string(outside.path().join("secret.txt")).unwrap(),
            "keep"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_through_symlink_behind_missing_dir_denied() {
        let (_db, dir, browser) = setup().await;
        let _outside = link_outside(&dir);

        let result = browser.download("alice", "ghost/../link/secret.txt").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_delete_through_symlink_behind_missing_dir_denied() {
        let (_db, dir, browser) = setup().await;
        let outside = link_outside(&dir);

        let result = browser.delete("alice", "ghost/../link/secret.txt").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
        let result = browser.delete("alice", "ghost/../link").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));

        assert!(outside.path().join("secret.txt").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_denied() {
        let (_db, dir, browser) = setup().await;
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path().join("new"), dir.path().join("drop")).unwrap();

        let result = browser
            .upload("alice", "drop", vec![UploadedFile::new("a.txt", "a")])
            .await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
        assert!(!outside.path().join("new").exists());
    }

    #[tokio::test]
    async fn test_list_sort_order() {
        let (_db, dir, browser) = setup().await;
        stdfs::write(dir.path().join("b.txt"), "b").unwrap();
        stdfs::create_dir(dir.path().join("A")).unwrap();
        stdfs::write(dir.path().join("a.txt"), "a").unwrap();
        stdfs::create_dir(dir.path().join("B")).unwrap();

        let listing = browser.list("alice", "").await.unwrap();
        assert_eq!(names(&listing), vec!["A", "B", "a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_list_hides_reserved_names() {
        let (_db, dir, browser) = setup().await;
        stdfs::create_dir(dir.path().join("System Volume Information")).unwrap();
        stdfs::create_dir(dir.path().join("$RECYCLE.BIN")).unwrap();
        stdfs::write(dir.path().join("pagefile.sys"), "x").unwrap();
        stdfs::write(dir.path().join("notes.txt"), "x").unwrap();

        let listing = browser.list("alice", "").await.unwrap();
        assert_eq!(names(&listing), vec!["notes.txt"]);
    }

    #[tokio::test]
    async fn test_list_entry_fields() {
        let (_db, dir, browser) = setup().await;
        stdfs::create_dir_all(dir.path().join("docs/inner")).unwrap();
        stdfs::write(dir.path().join("docs/readme.md"), "hello").unwrap();

        let listing = browser.list("alice", "docs").await.unwrap();

        assert_eq!(names(&listing), vec!["inner", "readme.md"]);
        let inner = &listing.entries[0];
        assert!(inner.is_dir);
        assert_eq!(inner.size, None);
        assert_eq!(inner.path, "docs/inner");
        let readme = &listing.entries[1];
        assert!(!readme.is_dir);
        assert_eq!(readme.size, Some(5));
        assert_eq!(readme.path, "docs/readme.md");
        assert!(listing.entries.iter().all(|e| !e.path.starts_with("../")));
    }

    #[tokio::test]
    async fn test_list_navigation() {
        let (_db, dir, browser) = setup().await;
        stdfs::create_dir_all(dir.path().join("a/b/c")).unwrap();

        let root = browser.list("alice", "").await.unwrap();
        assert_eq!(root.parent_path, "");
        assert!(root.breadcrumbs.is_empty());
        assert_eq!(
            root.root_path,
            dir.path().canonicalize().unwrap().to_string_lossy()
        );

        let top = browser.list("alice", "a").await.unwrap();
        assert_eq!(top.parent_path, "");

        let deep = browser.list("alice", "a/b/c").await.unwrap();
        assert_eq!(deep.parent_path, "a/b");
        assert_eq!(deep.current_path, "a/b/c");
        assert_eq!(
            deep.breadcrumbs,
            vec![
                Breadcrumb { name: "a".into(), path: "a".into() },
                Breadcrumb { name: "b".into(), path: "a/b".into() },
                Breadcrumb { name: "c".into(), path: "a/b/c".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_missing_is_not_found() {
        let (_db, _dir, browser) = setup().await;

        let result = browser.list("alice", "missing").await;
        assert!(matches!(result, Err(CloudError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_file_degrades_to_empty() {
        let (_db, dir, browser) = setup().await;
        stdfs::write(dir.path().join("file.txt"), "x").unwrap();

        let listing = browser.list("alice", "file.txt").await.unwrap();
        assert!(listing.entries.is_empty());
        assert!(listing.breadcrumbs.is_empty());
        assert_eq!(listing.parent_path, "");
        assert!(!listing.disk_partitions.is_empty());
    }

    #[tokio::test]
    async fn test_create_folder_idempotent() {
        let (_db, dir, browser) = setup().await;

        browser.create_folder("alice", "", "photos").await.unwrap();
        stdfs::write(dir.path().join("photos/cat.jpg"), "meow").unwrap();
        browser.create_folder("alice", "", "photos").await.unwrap();

        assert_eq!(
            stdfs::read_to_string(dir.path().join("photos/cat.jpg")).unwrap(),
            "meow"
        );
    }

    #[tokio::test]
    async fn test_create_folder_nested_target() {
        let (_db, dir, browser) = setup().await;
        stdfs::create_dir(dir.path().join("docs")).unwrap();

        browser.create_folder("alice", "docs", "2024").await.unwrap();
        assert!(dir.path().join("docs/2024").is_dir());
    }

    #[tokio::test]
    async fn test_create_folder_rejects_bad_names() {
        let (_db, _dir, browser) = setup().await;

        for name in ["", "..", "a/b", "../escape"] {
            let result = browser.create_folder("alice", "", name).await;
            assert!(matches!(result, Err(CloudError::PathDenied(_))), "{name}");
        }
    }

    #[tokio::test]
    async fn test_create_folder_over_file_fails() {
        let (_db, dir, browser) = setup().await;
        stdfs::write(dir.path().join("taken"), "x").unwrap();

        let result = browser.create_folder("alice", "", "taken").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let (_db, _dir, browser) = setup().await;
        let content = vec![0u8, 159, 146, 150, 255];

        let outcomes = browser
            .upload(
                "alice",
                "inbox",
                vec![UploadedFile::new("data.bin", content.clone())],
            )
            .await
            .unwrap();
        assert!(outcomes[0].is_stored());

        let download = browser.download("alice", "inbox/data.bin").await.unwrap();
        assert_eq!(download.file_name, "data.bin");
        assert_eq!(download.content, content);
    }

    #[tokio::test]
    async fn test_upload_overwrites() {
        let (_db, dir, browser) = setup().await;
        stdfs::write(dir.path().join("a.txt"), "old").unwrap();

        browser
            .upload("alice", "", vec![UploadedFile::new("a.txt", "new")])
            .await
            .unwrap();

        assert_eq!(stdfs::read_to_string(dir.path().join("a.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_upload_partial_failure_keeps_going() {
        let (_db, dir, browser) = setup().await;
        // A directory with the same name makes that single write fail.
        stdfs::create_dir(dir.path().join("blocked")).unwrap();

        let outcomes = browser
            .upload(
                "alice",
                "",
                vec![
                    UploadedFile::new("one.txt", "1"),
                    UploadedFile::new("blocked", "2"),
                    UploadedFile::new("three.txt", "3"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_stored());
        assert!(!outcomes[1].is_stored());
        assert!(outcomes[2].is_stored());
        assert!(dir.path().join("one.txt").is_file());
        assert!(dir.path().join("three.txt").is_file());
    }

    #[tokio::test]
    async fn test_upload_strips_directories_from_names() {
        let (_db, dir, browser) = setup().await;
        stdfs::create_dir(dir.path().join("inbox")).unwrap();

        let outcomes = browser
            .upload(
                "alice",
                "inbox",
                vec![
                    UploadedFile::new("../../evil.txt", "x"),
                    UploadedFile::new("..", "y"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(outcomes[0].name, "evil.txt");
        assert!(dir.path().join("inbox/evil.txt").is_file());
        assert!(matches!(
            outcomes[1].status,
            UploadStatus::Failed(CloudError::PathDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_escape_denied() {
        let (_db, _dir, browser) = setup().await;

        let result = browser
            .upload("alice", "../x", vec![UploadedFile::new("a.txt", "a")])
            .await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let (_db, _dir, browser) = setup().await;

        let outcome = browser.delete("alice", "docs/ghost.txt").await.unwrap();
        assert!(!outcome.removed);
        assert_eq!(outcome.parent_path, "docs");
    }

    #[tokio::test]
    async fn test_delete_file_and_directory() {
        let (_db, dir, browser) = setup().await;
        stdfs::create_dir_all(dir.path().join("docs/deep/er")).unwrap();
        stdfs::write(dir.path().join("docs/deep/er/f.txt"), "x").unwrap();
        stdfs::write(dir.path().join("docs/note.txt"), "x").unwrap();

        let outcome = browser.delete("alice", "docs/note.txt").await.unwrap();
        assert!(outcome.removed);
        assert_eq!(outcome.parent_path, "docs");
        assert!(!dir.path().join("docs/note.txt").exists());

        let outcome = browser.delete("alice", "docs/deep").await.unwrap();
        assert!(outcome.removed);
        assert!(!dir.path().join("docs/deep").exists());

        let outcome = browser.delete("alice", "docs").await.unwrap();
        assert_eq!(outcome.parent_path, "");
    }

    #[tokio::test]
    async fn test_delete_reserved_and_root_denied() {
        let (_db, dir, browser) = setup().await;
        stdfs::write(dir.path().join("hiberfil.sys"), "x").unwrap();

        let result = browser.delete("alice", "hiberfil.sys").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
        assert!(dir.path().join("hiberfil.sys").exists());

        let result = browser.delete("alice", "").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
    }

    #[tokio::test]
    async fn test_delete_escape_denied() {
        let (_db, _dir, browser) = setup().await;

        let result = browser.delete("alice", "../important").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
    }

    #[tokio::test]
    async fn test_download_reserved_denied() {
        let (_db, dir, browser) = setup().await;
        stdfs::write(dir.path().join("pagefile.sys"), "secret").unwrap();

        let result = browser.download("alice", "pagefile.sys").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
    }

    #[tokio::test]
    async fn test_download_missing_or_directory() {
        let (_db, dir, browser) = setup().await;
        stdfs::create_dir(dir.path().join("docs")).unwrap();

        assert!(matches!(
            browser.download("alice", "docs").await,
            Err(CloudError::NotFound(_))
        ));
        assert!(matches!(
            browser.download("alice", "nothing.txt").await,
            Err(CloudError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_set_mount_path_creates_and_switches() {
        let (_db, _dir, browser) = setup().await;
        let other = TempDir::new().unwrap();
        let mount = other.path().join("mounted/drive");

        let root = browser
            .set_mount_path("alice", mount.to_str().unwrap())
            .await
            .unwrap();
        assert!(mount.is_dir());
        assert_eq!(root, mount.canonicalize().unwrap());

        stdfs::write(mount.join("here.txt"), "x").unwrap();
        let listing = browser.list("alice", "").await.unwrap();
        assert_eq!(names(&listing), vec!["here.txt"]);

        let info = browser.current_root("alice").await.unwrap();
        assert!(info.is_custom);
        let info = browser.current_root("bob").await.unwrap();
        assert!(!info.is_custom);
    }

    #[tokio::test]
    async fn test_set_mount_path_failure_keeps_previous_root() {
        let (_db, dir, browser) = setup().await;
        stdfs::write(dir.path().join("plain.txt"), "x").unwrap();
        let before = browser.current_root("alice").await.unwrap();

        let bad = dir.path().join("plain.txt/sub");
        let result = browser.set_mount_path("alice", bad.to_str().unwrap()).await;

        assert!(result.is_err());
        assert_eq!(browser.current_root("alice").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_set_mount_path_empty_denied() {
        let (_db, _dir, browser) = setup().await;

        let result = browser.set_mount_path("alice", "   ").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
    }

    #[tokio::test]
    async fn test_mount_allowlist() {
        let (db, _dir, _) = setup().await;
        let allowed = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let browser = ScopedFileBrowser::new(db.pool().clone(), allowed.path())
            .with_mount_allowlist(vec![allowed.path().to_path_buf()]);

        let inside = allowed.path().join("alice");
        assert!(browser
            .set_mount_path("alice", inside.to_str().unwrap())
            .await
            .is_ok());

        let result = browser
            .set_mount_path("alice", elsewhere.path().to_str().unwrap())
            .await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
        assert_eq!(
            browser.current_root("alice").await.unwrap().root_path,
            inside.canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_strict_policy_confines_custom_roots() {
        let (_db, _dir, browser) = setup().await;
        let base = TempDir::new().unwrap();
        let mount = base.path().join("mount");
        browser
            .set_mount_path("alice", mount.to_str().unwrap())
            .await
            .unwrap();

        let result = browser.create_folder("alice", "..", "sibling").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
        assert!(!base.path().join("sibling").exists());
    }

    #[tokio::test]
    async fn test_trust_custom_roots_policy() {
        let (db, dir, _) = setup().await;
        let browser = ScopedFileBrowser::new(db.pool().clone(), dir.path())
            .with_policy(ConfinementPolicy::TrustCustomRoots);
        let base = TempDir::new().unwrap();
        let mount = base.path().join("mount");
        stdfs::write(base.path().join("outside.txt"), "x").unwrap();
        browser
            .set_mount_path("alice", mount.to_str().unwrap())
            .await
            .unwrap();

        // Listing, folder creation and delete may leave a custom root.
        browser.create_folder("alice", "..", "sibling").await.unwrap();
        assert!(base.path().join("sibling").is_dir());

        // Upload and download never do.
        let result = browser
            .upload("alice", "..", vec![UploadedFile::new("x.txt", "x")])
            .await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
        let result = browser.download("alice", "../outside.txt").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));

        // Default-root users stay confined.
        let result = browser.resolve("bob", "..").await;
        assert!(matches!(result, Err(CloudError::PathDenied(_))));
    }

    #[tokio::test]
    async fn test_mount_persists_across_browsers() {
        let (db, dir, browser) = setup().await;
        let other = TempDir::new().unwrap();
        browser
            .set_mount_path("alice", other.path().to_str().unwrap())
            .await
            .unwrap();

        let fresh = ScopedFileBrowser::new(db.pool().clone(), dir.path());
        let info = fresh.current_root("alice").await.unwrap();
        assert_eq!(info.root_path, other.path().canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_validate_path() {
        let (_db, dir, browser) = setup().await;

        assert!(browser.validate_path(dir.path().to_str().unwrap()).await);
        assert!(!browser.validate_path("/definitely/not/here/123").await);
        assert!(!browser.validate_path("").await);
    }

    #[test]
    fn test_breadcrumbs_follow_every_segment() {
        let crumbs = breadcrumbs("docs/2024");
        assert_eq!(crumbs.len(), 2);
        assert_eq!(crumbs[0].name, "docs");
        assert_eq!(crumbs[0].path, "docs");
        assert_eq!(crumbs[1].name, "2024");
        assert_eq!(crumbs[1].path, "docs/2024");

        let crumbs = breadcrumbs("a//b/");
        let names: Vec<&str> = crumbs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "", "b", ""]);
        assert_eq!(crumbs[2].path, "a//b");
        assert_eq!(crumbs[3].path, "a//b/");

        assert!(breadcrumbs("").is_empty());
    }
}
