//! Logical path decoding and normalization.

use std::io;
use std::path::{Component, Path, PathBuf};

use super::CloudError;

/// URL-decode a logical path.
pub(crate) fn decode(logical: &str) -> Result<String, CloudError> {
    urlencoding::decode(logical)
        .map(|s| s.into_owned())
        .map_err(|_| CloudError::PathDenied(logical.to_string()))
}

/// Make a path absolute and resolve `.`, `..` and symlinks.
///
/// Components are resolved left to right like `realpath`: each one that
/// exists is canonicalized before the next `..` is applied, so a symlink
/// reached after stepping out of a missing directory is still followed.
/// Components that do not exist are kept lexically. A dangling symlink is
/// an error, since writing through it would create its target.
pub(crate) async fn normalize(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                let candidate = resolved.join(name);
                match tokio::fs::canonicalize(&candidate).await {
                    Ok(real) => resolved = real,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        if let Ok(meta) = tokio::fs::symlink_metadata(&candidate).await {
                            if meta.file_type().is_symlink() {
                                return Err(io::Error::new(
                                    io::ErrorKind::InvalidInput,
                                    format!("dangling symlink: {}", candidate.display()),
                                ));
                            }
                        }
                        resolved = candidate;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }
    Ok(resolved)
}

/// Express `path` relative to `root` with `/` separators.
///
/// Returns `None` when `path` is not inside `root`.
pub(crate) fn relative_slash(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Reduce a client-supplied file name to its final component.
///
/// Both `/` and `\` count as separators. Returns `None` for names with no
/// usable final component.
pub(crate) fn sanitize_file_name(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next()?;
    match base {
        "" | "." | ".." => None,
        _ => Some(base),
    }
}

/// Check that a new folder name is a single plain component.
pub(crate) fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
