//! Transfer service.

use std::sync::Arc;
use std::time::Duration;

use picpost_shared::types::UserId;
use tracing::{debug, info};

use super::error::TransferError;
use super::store::ObjectStore;
use super::types::UploadLocator;
use crate::storage::sanitize_filename;
use crate::transform::TransformedAsset;

/// Uploads transformed assets and confirms them before handing out a URL.
#[derive(Clone)]
pub struct TransferService {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl TransferService {
    /// Default network timeout: 120 seconds.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Create a transfer service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Storage key for `asset` under the user's prefix.
    #[must_use]
    pub fn destination_path(user_id: UserId, asset: &TransformedAsset) -> String {
        format!("users/{user_id}/{}", sanitize_filename(&asset.filename))
    }

    /// Write `asset` at `path`, confirm it and resolve its URL.
    ///
    /// Safe to repeat with the same arguments: the object is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails, the stored size does not match
    /// the payload, or the whole exchange exceeds the timeout.
    pub async fn transfer(
        &self,
        asset: &TransformedAsset,
        path: &str,
    ) -> Result<UploadLocator, TransferError> {
        match tokio::time::timeout(self.timeout, self.write_and_confirm(asset, path)).await {
            Ok(result) => result,
            Err(_) => Err(TransferError::Timeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }

    async fn write_and_confirm(
        &self,
        asset: &TransformedAsset,
        path: &str,
    ) -> Result<UploadLocator, TransferError> {
        self.store
            .write(path, asset.bytes.clone(), asset.content_type)
            .await?;

        let meta = self.store.stat(path).await?;
        if meta.file_size != asset.size() {
            return Err(TransferError::NotDurable {
                expected: asset.size(),
                actual: meta.file_size,
            });
        }
        debug!(path, size = meta.file_size, "Upload confirmed");

        let url = self.store.resolve_url(path).await?;
        info!(path, size = meta.file_size, "Asset transferred");

        Ok(UploadLocator {
            path: path.to_string(),
            url,
            size: meta.file_size,
        })
    }
}

impl std::fmt::Debug for TransferService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferService")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
