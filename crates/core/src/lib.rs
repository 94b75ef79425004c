//! Core upload pipeline for Picpost.
//!
//! One image in, one stored reference out. The crate has no database or
//! HTTP dependencies of its own: media capture, object storage and the
//! document store are capabilities injected through traits.
//!
//! # Modules
//!
//! - `media` - Acquiring a local image from a picker or camera
//! - `transform` - Resizing and re-encoding
//! - `storage` - Vendor-agnostic object storage (OpenDAL)
//! - `transfer` - Uploading with durability confirmation
//! - `profile` - Recording the image URL on the user's document
//! - `pipeline` - The coordinator and its state machine

pub mod media;
pub mod pipeline;
pub mod profile;
pub mod storage;
pub mod transfer;
pub mod transform;
