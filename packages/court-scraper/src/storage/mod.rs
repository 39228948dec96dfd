//! Durable key-value storage.
//!
//! The pipeline persists a handful of blobs: the full dataset, the curated
//! output (and its mirrors), and one file per photo. Keys are slash-separated
//! relative paths. Implementations must make `write` all-or-nothing: a reader
//! sees either the previous value or the new one, never a torn write.

mod fs;
mod memory;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;

use crate::error::StorageResult;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a blob. Missing keys are `Ok(None)`.
    async fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replace a blob atomically.
    async fn write(&self, key: &str, bytes: &[u8]) -> StorageResult<()>;
}

#[async_trait]
impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    async fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        (**self).write(key, bytes).await
    }
}
