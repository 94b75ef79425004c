//! Object store capability.

use async_trait::async_trait;
use bytes::Bytes;

use crate::storage::{ObjectMetadata, StorageError, StorageService};

/// Durable remote storage as seen by the transfer stage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` at `path`, replacing what is there.
    async fn write(&self, path: &str, bytes: Bytes, content_type: &str)
    -> Result<(), StorageError>;

    /// Metadata of the object at `path`.
    async fn stat(&self, path: &str) -> Result<ObjectMetadata, StorageError>;

    /// URL under which the object at `path` can be read.
    async fn resolve_url(&self, path: &str) -> Result<String, StorageError>;

    /// Bytes behind a URL returned by [`ObjectStore::resolve_url`].
    async fn fetch(&self, url: &str) -> Result<Bytes, StorageError>;
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn write(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        StorageService::write(self, path, bytes, content_type).await
    }

    async fn stat(&self, path: &str) -> Result<ObjectMetadata, StorageError> {
        StorageService::stat(self, path).await
    }

    async fn resolve_url(&self, path: &str) -> Result<String, StorageError> {
        self.access_url(path).await
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, StorageError> {
        StorageService::fetch(self, url).await
    }
}
