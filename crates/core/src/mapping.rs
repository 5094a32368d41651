//! Local path ↔ object key mapping
//!
//! Uploads key each object by the file's absolute local path, so a later
//! download that strips a known prefix reconstructs the original tree.

use std::path::{Component, Path, PathBuf};

use crate::error::{TransferError, TransferErrorKind};

/// Maps local paths to object keys and object keys back to local paths
#[derive(Debug, Clone, Default)]
pub struct PathMapper {
    key_prefix: String,
}

impl PathMapper {
    /// Mapper that keys objects by their verbatim absolute path
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapper that prepends `prefix` to every uploaded key
    pub fn with_key_prefix(prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: prefix.into(),
        }
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Object key for an uploaded file
    ///
    /// Relative paths are made absolute against the current directory
    /// without resolving symlinks.
    pub fn remote_key(&self, local: &Path) -> std::io::Result<String> {
        let absolute = absolute_path(local)?;
        Ok(format!("{}{}", self.key_prefix, absolute.to_string_lossy()))
    }

    /// Local file path for a downloaded object
    ///
    /// `src_prefix` is stripped from the key; if nothing is left the key's
    /// last component is used instead. Leading slashes are dropped so an
    /// absolute key lands beneath `dest_root`.
    pub fn local_destination(
        key: &str,
        src_prefix: &str,
        dest_root: &Path,
    ) -> Result<PathBuf, TransferError> {
        let relative = key
            .strip_prefix(src_prefix)
            .unwrap_or(key)
            .trim_start_matches('/');

        let relative = if relative.is_empty() {
            base_name(key)
        } else {
            relative
        };

        if relative.is_empty() {
            return Err(TransferError::new(
                TransferErrorKind::InvalidKey,
                format!("'{key}' has no file name"),
            ));
        }

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(TransferError::new(
                TransferErrorKind::InvalidKey,
                format!("'{key}' escapes {}", dest_root.display()),
            ));
        }

        Ok(dest_root.join(relative))
    }
}

/// Absolute form of `path` with `.` and `..` removed lexically
///
/// Symlinks are not resolved, so `link/..` collapses to the directory
/// holding `link`.
pub fn absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// Destination root for downloads: the given prefix or the current directory
pub fn resolve_dest_root(dest_prefix: Option<&Path>) -> std::io::Result<PathBuf> {
    match dest_prefix {
        Some(p) if !p.as_os_str().is_empty() => Ok(p.to_path_buf()),
        _ => std::env::current_dir(),
    }
}

fn base_name(key: &str) -> &str {
    key.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_key_absolute_path_verbatim() {
        let mapper = PathMapper::new();
        let key = mapper.remote_key(Path::new("/data/sub/b.txt")).unwrap();
        assert_eq!(key, "/data/sub/b.txt");
    }

    #[test]
    fn test_remote_key_relative_path_made_absolute() {
        let mapper = PathMapper::new();
        for relative in ["notes.txt", "./notes.txt", "../notes.txt"] {
            let key = mapper.remote_key(Path::new(relative)).unwrap();
            let path = Path::new(&key);
            assert!(path.is_absolute(), "{key}");
            assert!(key.ends_with("/notes.txt"), "{key}");
            assert!(
                path.components()
                    .all(|c| matches!(c, Component::RootDir | Component::Normal(_))),
                "{key}"
            );
        }
    }

    #[test]
    fn test_remote_key_collapses_parent_components() {
        let mapper = PathMapper::new();
        let key = mapper
            .remote_key(Path::new("/work/../data/./sub/../a.txt"))
            .unwrap();
        assert_eq!(key, "/data/a.txt");
    }

    #[test]
    fn test_absolute_path_stops_at_root() {
        assert_eq!(
            absolute_path(Path::new("/../../etc/hosts")).unwrap(),
            PathBuf::from("/etc/hosts")
        );
    }

    #[test]
    fn test_key_with_collapsed_parents_maps_back_under_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("work/../data/a.txt");
        let key = PathMapper::new().remote_key(&source).unwrap();

        let restore = dir.path().join("restore");
        let dest = PathMapper::local_destination(&key, "", &restore).unwrap();
        let expected = dir.path().join("data/a.txt");
        assert_eq!(dest, restore.join(expected.strip_prefix("/").unwrap()));
    }

    #[test]
    fn test_remote_key_with_prefix() {
        let mapper = PathMapper::with_key_prefix("host-a");
        let key = mapper.remote_key(Path::new("/data/a.txt")).unwrap();
        assert_eq!(key, "host-a/data/a.txt");
    }

    #[test]
    fn test_destination_for_absolute_key() {
        let dest = PathMapper::local_destination("/data/a.txt", "", Path::new("/restore")).unwrap();
        assert_eq!(dest, PathBuf::from("/restore/data/a.txt"));
    }

    #[test]
    fn test_destination_strips_prefix() {
        let dest =
            PathMapper::local_destination("/data/sub/b.txt", "/data/", Path::new("/restore"))
                .unwrap();
        assert_eq!(dest, PathBuf::from("/restore/sub/b.txt"));
    }

    #[test]
    fn test_destination_falls_back_to_base_name() {
        let dest =
            PathMapper::local_destination("/data/a.txt", "/data/a.txt", Path::new("/restore"))
                .unwrap();
        assert_eq!(dest, PathBuf::from("/restore/a.txt"));
    }

    #[test]
    fn test_destination_prefix_not_matching_keeps_key() {
        let dest =
            PathMapper::local_destination("logs/x.log", "other/", Path::new("out")).unwrap();
        assert_eq!(dest, PathBuf::from("out/logs/x.log"));
    }

    #[test]
    fn test_destination_rejects_parent_components() {
        let err = PathMapper::local_destination("../../etc/passwd", "", Path::new("/restore"))
            .unwrap_err();
        assert_eq!(err.kind, TransferErrorKind::InvalidKey);
    }

    #[test]
    fn test_destination_rejects_empty_name() {
        let err = PathMapper::local_destination("/", "", Path::new("/restore")).unwrap_err();
        assert_eq!(err.kind, TransferErrorKind::InvalidKey);
    }

    #[test]
    fn test_resolve_dest_root_defaults_to_cwd() {
        assert!(resolve_dest_root(None).unwrap().is_absolute());
        assert!(resolve_dest_root(Some(Path::new(""))).unwrap().is_absolute());

        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(
            resolve_dest_root(Some(dir.path())).unwrap(),
            dir.path().to_path_buf()
        );
    }
}
