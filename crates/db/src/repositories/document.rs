//! User document repository.

use std::sync::Arc;

use async_trait::async_trait;
use picpost_core::profile::{DocumentStore, DocumentStoreError};
use picpost_shared::types::UserId;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, EntityTrait, SqlErr, Statement,
};
use serde_json::Value;
use tracing::debug;

use crate::entities::user_documents;

/// Sets one key of the document; other keys are left untouched.
const WRITE_FIELD_SQL: &str = r"
UPDATE user_documents
SET fields = fields || jsonb_build_object($2::text, $3::text),
    updated_at = now()
WHERE user_id = $1
";

const ENSURE_DOCUMENT_SQL: &str = r"
INSERT INTO user_documents (user_id)
VALUES ($1)
ON CONFLICT (user_id) DO NOTHING
";

/// Postgres-backed [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    // Arc keeps the repository cloneable when sea-orm's `mock` feature is on.
    db: Arc<DatabaseConnection>,
}

impl DocumentRepository {
    /// Creates a new document repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Creates an empty document for the user unless one exists.
    ///
    /// Returns `true` if a document was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn ensure_document(&self, user_id: UserId) -> Result<bool, DbErr> {
        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                DatabaseBackend::Postgres,
                ENSURE_DOCUMENT_SQL,
                [user_id.into_inner().into()],
            ))
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Finds a user's document.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, user_id: UserId) -> Result<Option<user_documents::Model>, DbErr> {
        user_documents::Entity::find_by_id(user_id.into_inner())
            .one(self.db.as_ref())
            .await
    }
}

fn map_db_err(err: &DbErr) -> DocumentStoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg) | SqlErr::ForeignKeyConstraintViolation(msg)) => {
            DocumentStoreError::Conflict(msg)
        }
        _ => {
            let msg = err.to_string();
            // Postgres reports insufficient_privilege with this text
            if msg.contains("permission denied") {
                DocumentStoreError::PermissionDenied(msg)
            } else {
                DocumentStoreError::backend(msg)
            }
        }
    }
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn write_field(
        &self,
        user_id: UserId,
        field: &str,
        value: &str,
    ) -> Result<(), DocumentStoreError> {
        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                DatabaseBackend::Postgres,
                WRITE_FIELD_SQL,
                [
                    user_id.into_inner().into(),
                    field.into(),
                    value.into(),
                ],
            ))
            .await
            .map_err(|e| map_db_err(&e))?;

        if result.rows_affected() == 0 {
            return Err(DocumentStoreError::not_found(user_id));
        }
        debug!(user_id = %user_id, field, "Document field written");
        Ok(())
    }

    async fn read_field(
        &self,
        user_id: UserId,
        field: &str,
    ) -> Result<Option<String>, DocumentStoreError> {
        let document = self
            .find(user_id)
            .await
            .map_err(|e| map_db_err(&e))?
            .ok_or_else(|| DocumentStoreError::not_found(user_id))?;

        Ok(document
            .fields
            .get(field)
            .and_then(Value::as_str)
            .map(String::from))
    }
}
