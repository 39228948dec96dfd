//! In-memory storage for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::Storage;
use crate::error::{StorageError, StorageResult};

/// In-memory blob store.
///
/// Counts writes and can be told to start failing after a number of
/// successful writes, which is how tests simulate a disk going away mid-run.
#[derive(Default)]
pub struct MemoryStorage {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
    writes: AtomicUsize,
    fail_after: RwLock<Option<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob without counting it as a write.
    pub fn with_blob(self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.blobs.write().unwrap().insert(key.into(), bytes.into());
        self
    }

    /// Fail every write once `n` writes have succeeded.
    pub fn fail_writes_after(&self, n: usize) {
        *self.fail_after.write().unwrap() = Some(n);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.read().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        if let Some(limit) = *self.fail_after.read().unwrap() {
            if self.write_count() >= limit {
                return Err(StorageError::Write {
                    key: key.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "injected failure"),
                });
            }
        }

        self.blobs
            .write()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_failure_leaves_previous_value() {
        let storage = MemoryStorage::new();
        storage.write("k", b"v1").await.unwrap();
        storage.fail_writes_after(1);

        assert!(storage.write("k", b"v2").await.is_err());
        assert_eq!(storage.get("k").as_deref(), Some(&b"v1"[..]));
        assert_eq!(storage.write_count(), 1);
    }
}
