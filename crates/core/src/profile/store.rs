//! Document store capability.

use async_trait::async_trait;
use picpost_shared::types::UserId;

use super::error::DocumentStoreError;

/// Per-user key/value document, one document per user.
///
/// Writes replace the field's value; other fields are left alone.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Set `field` to `value` on the user's document.
    ///
    /// Fails with [`DocumentStoreError::NotFound`] when the user has no
    /// document.
    async fn write_field(
        &self,
        user_id: UserId,
        field: &str,
        value: &str,
    ) -> Result<(), DocumentStoreError>;

    /// Current value of `field`, `None` if the field was never written.
    async fn read_field(
        &self,
        user_id: UserId,
        field: &str,
    ) -> Result<Option<String>, DocumentStoreError>;
}
