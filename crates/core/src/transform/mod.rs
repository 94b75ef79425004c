//! Transform stage: decode, fit to width, re-encode.
//!
//! Output is deterministic for a given input and [`TransformSpec`]: encoder
//! settings are fixed and the suggested filename is derived from the
//! encoded bytes, so repeating a transform yields the same asset and the
//! same destination path.

mod error;
mod service;
mod spec;
mod types;

#[cfg(test)]
mod transform_props;

pub use error::TransformError;
pub use service::{ImageTransformer, transform_bytes};
pub use spec::{OutputFormat, TransformSpec};
pub use types::TransformedAsset;
