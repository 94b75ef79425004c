//! Shared identifiers, errors, and configuration for Picpost.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for users and pipeline runs
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::AppError;
