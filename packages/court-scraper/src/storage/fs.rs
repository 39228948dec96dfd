use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::Storage;
use crate::error::{StorageError, StorageResult};

/// Filesystem storage rooted at a directory.
///
/// Writes go to a sibling `.tmp` file which is synced and then renamed over
/// the target, so an interrupted write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key under the root. Keys must be plain relative paths.
    pub fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || !plain {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let write_err = |source: std::io::Error| StorageError::Write {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = fs::File::create(&tmp).await.map_err(write_err)?;
        file.write_all(bytes).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);
        fs::rename(&tmp, &path).await.map_err(write_err)?;

        tracing::trace!(key, bytes = bytes.len(), "Wrote blob");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        assert!(storage.read("data/courts_full.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());

        storage.write("data/photos/X.jpg", b"first").await.unwrap();
        storage.write("data/photos/X.jpg", b"second").await.unwrap();

        assert_eq!(
            storage.read("data/photos/X.jpg").await.unwrap().as_deref(),
            Some(&b"second"[..])
        );
        assert!(!dir.path().join("data/photos/X.jpg.tmp").exists());
    }

    #[tokio::test]
    async fn unwritable_target_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blocker"), b"file, not a dir").unwrap();
        let storage = FsStorage::new(dir.path());

        let err = storage.write("blocker/child.json", b"{}").await.unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("root");
        let storage = FsStorage::new(&root);

        for key in ["data/photos/../../../escaped.jpg", "../escaped.jpg", "/tmp/escaped.jpg", ""] {
            let err = storage.write(key, b"x").await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey { .. }), "{key} was accepted");
            assert!(matches!(storage.read(key).await, Err(StorageError::InvalidKey { .. })));
        }
        assert!(!parent.path().join("escaped.jpg").exists());
        assert_eq!(storage.path_for("data/courts.json").unwrap(), root.join("data/courts.json"));
    }
}
