//! Repository implementations for database access.

pub mod document;

pub use document::DocumentRepository;
