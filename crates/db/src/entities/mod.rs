//! `SeaORM` entities.

pub mod user_documents;
