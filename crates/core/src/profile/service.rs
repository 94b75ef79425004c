//! Profile persistence service.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use picpost_shared::types::UserId;
use tracing::info;

use super::error::PersistenceError;
use super::store::DocumentStore;
use super::types::{Ack, UserImageRecord};
use crate::transfer::UploadLocator;

/// Document field holding the user's image URL.
pub const IMAGE_FIELD: &str = "image_url";

/// Writes upload locators onto user documents.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl ProfileService {
    /// Default record write timeout: 15 seconds.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Create a profile service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Point the user's image field at `locator.url`, replacing any prior
    /// value. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write or it times out.
    pub async fn persist(
        &self,
        user_id: UserId,
        locator: &UploadLocator,
    ) -> Result<Ack, PersistenceError> {
        let write = self.store.write_field(user_id, IMAGE_FIELD, &locator.url);
        match tokio::time::timeout(self.timeout, write).await {
            Err(_) => {
                return Err(PersistenceError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
            Ok(result) => result?,
        }

        info!(user_id = %user_id, path = %locator.path, "Profile image updated");
        Ok(Ack {
            user_id,
            url: locator.url.clone(),
            written_at: Utc::now(),
        })
    }

    /// The image currently recorded for the user, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails or times out.
    pub async fn current_image(
        &self,
        user_id: UserId,
    ) -> Result<Option<UserImageRecord>, PersistenceError> {
        let read = self.store.read_field(user_id, IMAGE_FIELD);
        let value = tokio::time::timeout(self.timeout, read)
            .await
            .map_err(|_| PersistenceError::Timeout {
                secs: self.timeout.as_secs(),
            })??;

        Ok(value.map(|image_url| UserImageRecord { user_id, image_url }))
    }
}

impl std::fmt::Debug for ProfileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileService")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
