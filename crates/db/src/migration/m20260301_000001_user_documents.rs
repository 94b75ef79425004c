//! User documents migration.
//!
//! Creates the per-user document table the profile image URL is stored in.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(USER_DOCUMENTS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS user_documents CASCADE;")
            .await?;
        Ok(())
    }
}

const USER_DOCUMENTS_SQL: &str = r"
-- One schemaless document per user account
CREATE TABLE user_documents (
    user_id UUID PRIMARY KEY,
    fields JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_fields_object CHECK (jsonb_typeof(fields) = 'object')
);

-- Lookups of users by their current image
CREATE INDEX idx_user_documents_image_url ON user_documents ((fields ->> 'image_url'));
";
