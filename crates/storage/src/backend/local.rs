//! Local filesystem storage backend.
//!
//! This module provides the persistent storage backend. Each key is stored as
//! one file in a configured directory and accessed using `tokio::fs` for
//! async I/O.

use crate::backend::EntryInfoStream;
use crate::error::ErrorKind;
use crate::{EntryInfo, StorageBackend, error::Result, key::validate as validate_key};
use async_stream::stream;
use async_trait::async_trait;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs::{self, DirEntry};

/// Local filesystem storage backend.
///
/// Stores one file per key in a directory on the local filesystem. Writes go
/// to a hidden temporary file first and are renamed into place, so a reader
/// never observes a half-written value. Hidden files are never listed (keys
/// cannot start with a `.`).
///
/// # Examples
///
/// ```no_run
/// use showreel_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/home/me/.local/share/showreel")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Directory holding one file per key
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Arguments
    /// * `root` - Absolute path to the storage directory; created if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute or is not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }

        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidRoot(root));
            }
        } else {
            // Use non-async here; it'll only happen once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root, ""))?;
        }

        Ok(Self { name: name.into(), root })
    }

    /// Get the absolute file path for a key.
    fn absolute_path(&self, key: &str) -> Result<PathBuf> {
        let validated = validate_key(key)?;
        Ok(self.root.join(validated))
    }

    /// Temporary sibling used while writing; never a valid key.
    fn staging_path(&self, key: &str) -> PathBuf {
        self.root.join(format!(".{key}.tmp"))
    }

    fn entry_info(key: &str, metadata: &Metadata) -> Result<EntryInfo> {
        let modified: OffsetDateTime = metadata.modified().map_err(ErrorKind::Io)?.into();
        Ok(EntryInfo::new(key, metadata.len(), modified))
    }

    fn map_io_error(e: std::io::Error, path: &Path, key: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Turns a directory entry into listing output, or `None` for anything
    /// that isn't a regular file named like a key.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&str>) -> Result<Option<EntryInfo>> {
        let file_name = entry.file_name();
        let Some(key) = file_name.to_str() else {
            return Ok(None);
        };
        if validate_key(key).is_err() || prefix.is_some_and(|pfx| !key.starts_with(pfx)) {
            return Ok(None);
        }
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path, key))?;
        if !metadata.is_file() {
            return Ok(None);
        }
        Ok(Some(Self::entry_info(key, &metadata)?))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys_stream<'a>(&'a self, prefix: Option<&'a str>) -> EntryInfoStream<'a> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                // Directory removed from under us: nothing stored.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return,
                Err(err) => {
                    yield Err(exn::Exn::from(Self::map_io_error(err, &self.root, "")));
                    return;
                }
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &self.root, ""))); continue; },
                };
                match self.process_entry(entry, prefix).await {
                    Ok(Some(info)) => yield Ok(info),
                    Ok(None) => {},
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, &abs_path, key))?)
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        let staging = self.staging_path(key);
        fs::write(&staging, data).await.map_err(|e| Self::map_io_error(e, &staging, key))?;
        Ok(fs::rename(&staging, &abs_path).await.map_err(|e| Self::map_io_error(e, &abs_path, key))?)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, &abs_path, key))?)
    }

    async fn stat(&self, key: &str) -> Result<EntryInfo> {
        let abs_path = self.absolute_path(key)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, &abs_path, key))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(key.to_string()));
        }
        Self::entry_info(key, &metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/path").is_err());
        assert!(LocalBackend::new("name", "./relative").is_err());
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("nested/store");
        LocalBackend::new("name", &root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let err = LocalBackend::new("name", &file).err().unwrap();
        assert!(matches!(&*err, ErrorKind::InvalidRoot(_)));
    }

    #[test]
    fn test_absolute_path() {
        let (temp_dir, backend) = backend();
        let expected = temp_dir.path().join("showreel.prefetch.v1");
        assert_eq!(backend.absolute_path("showreel.prefetch.v1").unwrap(), expected);
        assert!(backend.absolute_path("../etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (_temp_dir, backend) = backend();
        backend.write("key", b"Hello, world!").await.unwrap();
        assert_eq!(backend.read("key").await.unwrap(), b"Hello, world!");
        // Overwrite
        backend.write("key", b"bye").await.unwrap();
        assert_eq!(backend.read("key").await.unwrap(), b"bye");
    }

    #[tokio::test]
    async fn test_values_survive_new_backend_instance() {
        let (temp_dir, backend) = backend();
        backend.write("showreel.prefetch.v1", b"[\"a.mp4\"]").await.unwrap();
        drop(backend);
        let reopened = LocalBackend::new("local", temp_dir.path()).unwrap();
        assert_eq!(reopened.read("showreel.prefetch.v1").await.unwrap(), b"[\"a.mp4\"]");
    }

    #[tokio::test]
    async fn test_exists() {
        let (_temp_dir, backend) = backend();
        assert!(!backend.exists("nonexistent").await.unwrap());
        backend.write("exists", b"data").await.unwrap();
        assert!(backend.exists("exists").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_and_get_missing() {
        let (_temp_dir, backend) = backend();
        let err = backend.read("missing").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(k) if k == "missing"));
        assert_eq!(backend.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_temp_dir, backend) = backend();
        backend.write("file", b"data").await.unwrap();
        backend.delete("file").await.unwrap();
        assert!(!backend.exists("file").await.unwrap());
        let err = backend.delete("file").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stat() {
        let (_temp_dir, backend) = backend();
        backend.write("file", b"Hello, world!").await.unwrap();
        let info = backend.stat("file").await.unwrap();
        assert_eq!(info.key, "file");
        assert_eq!(info.size, 13);
    }

    #[tokio::test]
    async fn test_keys_skip_hidden_and_foreign_files() {
        let (temp_dir, backend) = backend();
        backend.write("showreel.prefetch.v1", b"[]").await.unwrap();
        backend.write("showreel.prefetch.v2", b"[]").await.unwrap();
        backend.write("preloadedVideos", b"[]").await.unwrap();
        std::fs::write(temp_dir.path().join(".staging.tmp"), b"x").unwrap();
        std::fs::write(temp_dir.path().join("has space"), b"x").unwrap();
        std::fs::create_dir(temp_dir.path().join("subdir")).unwrap();

        let mut all: Vec<_> = backend.keys(None).await.unwrap().into_iter().map(|e| e.key).collect();
        all.sort();
        assert_eq!(all, ["preloadedVideos", "showreel.prefetch.v1", "showreel.prefetch.v2"]);

        let prefixed = backend.keys(Some("showreel.")).await.unwrap();
        assert_eq!(prefixed.len(), 2);
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let (_temp_dir, backend) = backend();
        assert!(backend.keys(None).await.unwrap().is_empty());
    }
}
