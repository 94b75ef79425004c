//! Object storage for uploaded images using Apache OpenDAL.
//!
//! This module provides vendor-agnostic object storage with support for:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem (development only)
//! - In-process memory (tests and dry runs)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Apache OpenDAL                              │
//! │                   (Unified Storage API)                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ op.write_with("key", data) │ op.presign_read("key", duration)   │
//! │ op.read("key")             │ op.stat("key")                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Providers that cannot presign (local filesystem, memory) need a
//! `public_base_url`; [`StorageService::from_config`] refuses them otherwise.

mod config;
mod error;
mod service;

pub use config::StorageConfig;
pub use error::StorageError;
pub use picpost_shared::config::StorageProvider;
pub use service::{ObjectMetadata, PresignedUrl, StorageService, sanitize_filename};
