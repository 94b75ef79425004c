//! In-process document store.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use picpost_shared::types::UserId;

use super::error::DocumentStoreError;
use super::store::DocumentStore;

/// Document store backed by a concurrent map. Used for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<UserId, HashMap<String, String>>,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document for `user_id` if none exists.
    pub fn insert_user(&self, user_id: UserId) {
        self.documents.entry(user_id).or_default();
    }

    /// Number of documents held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn write_field(
        &self,
        user_id: UserId,
        field: &str,
        value: &str,
    ) -> Result<(), DocumentStoreError> {
        let mut doc = self
            .documents
            .get_mut(&user_id)
            .ok_or_else(|| DocumentStoreError::not_found(user_id))?;
        doc.insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn read_field(
        &self,
        user_id: UserId,
        field: &str,
    ) -> Result<Option<String>, DocumentStoreError> {
        let doc = self
            .documents
            .get(&user_id)
            .ok_or_else(|| DocumentStoreError::not_found(user_id))?;
        Ok(doc.get(field).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_unknown_user_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let err = store
            .write_field(UserId::new(), "image_url", "https://x")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::NotFound { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_write_replaces_only_that_field() {
        let store = InMemoryDocumentStore::new();
        let user = UserId::new();
        store.insert_user(user);

        store.write_field(user, "name", "ada").await.unwrap();
        store.write_field(user, "image_url", "a").await.unwrap();
        store.write_field(user, "image_url", "b").await.unwrap();

        assert_eq!(
            store.read_field(user, "image_url").await.unwrap().as_deref(),
            Some("b")
        );
        assert_eq!(
            store.read_field(user, "name").await.unwrap().as_deref(),
            Some("ada")
        );
        assert_eq!(store.read_field(user, "missing").await.unwrap(), None);
    }

    #[test]
    fn test_insert_user_keeps_existing_document() {
        let store = InMemoryDocumentStore::new();
        let user = UserId::new();
        store.insert_user(user);
        store.insert_user(user);
        assert_eq!(store.len(), 1);
    }
}
