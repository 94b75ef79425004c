//! Image transformer built on the `image` crate.

use std::time::Duration;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::error::TransformError;
use super::spec::{OutputFormat, TransformSpec};
use super::types::TransformedAsset;
use crate::media::{MediaData, MediaHandle};

/// Hex characters of the checksum kept in derived filenames.
const FILENAME_HASH_LEN: usize = 16;

/// Runs transforms on the blocking pool under a CPU budget.
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    budget: Duration,
}

impl ImageTransformer {
    /// Default CPU budget: 30 seconds.
    pub const DEFAULT_BUDGET: Duration = Duration::from_secs(30);

    /// Create a transformer with the given budget.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    /// Resize and re-encode the image behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is empty, unreadable or corrupt, if
    /// encoding fails, or if the budget runs out.
    pub async fn transform(
        &self,
        handle: &MediaHandle,
        spec: &TransformSpec,
    ) -> Result<TransformedAsset, TransformError> {
        let input = load(handle).await?;
        if input.is_empty() {
            return Err(TransformError::EmptyInput);
        }

        let spec = *spec;
        let worker = tokio::task::spawn_blocking(move || transform_bytes(&input, &spec));

        // On timeout the blocking task keeps running to completion; its
        // result is dropped.
        match tokio::time::timeout(self.budget, worker).await {
            Err(_) => Err(TransformError::Timeout {
                budget_secs: self.budget.as_secs(),
            }),
            Ok(Err(join)) => Err(TransformError::Worker(join.to_string())),
            Ok(Ok(result)) => result,
        }
    }
}

impl Default for ImageTransformer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUDGET)
    }
}

async fn load(handle: &MediaHandle) -> Result<Bytes, TransformError> {
    match handle.data() {
        MediaData::Bytes(bytes) => Ok(bytes.clone()),
        MediaData::Path(path) => tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|e| TransformError::Unreadable(format!("{}: {e}", path.display()))),
    }
}

/// Decode `input`, fit it to the target width and encode it.
///
/// This is the synchronous core of [`ImageTransformer::transform`].
///
/// # Errors
///
/// Returns an error if `input` is empty or not a decodable image, or if the
/// encoder fails or produces nothing.
pub fn transform_bytes(
    input: &[u8],
    spec: &TransformSpec,
) -> Result<TransformedAsset, TransformError> {
    if input.is_empty() {
        return Err(TransformError::EmptyInput);
    }

    let decoded =
        image::load_from_memory(input).map_err(|e| TransformError::decode(e.to_string()))?;
    let fitted = fit_width(decoded, spec.target_width());
    let (width, height) = (fitted.width(), fitted.height());

    let encoded = encode(&fitted, spec)?;
    if encoded.is_empty() {
        return Err(TransformError::EmptyOutput);
    }

    let checksum_sha256 = format!("{:x}", Sha256::digest(&encoded));
    let filename = format!(
        "{}.{}",
        &checksum_sha256[..FILENAME_HASH_LEN],
        spec.output_format().extension()
    );

    debug!(
        width,
        height,
        size = encoded.len(),
        format = %spec.output_format(),
        "Image transformed"
    );

    Ok(TransformedAsset {
        bytes: Bytes::from(encoded),
        content_type: spec.output_format().content_type(),
        filename,
        width,
        height,
        checksum_sha256,
    })
}

/// Shrink so the width is at most `target_width`, keeping the aspect ratio.
/// Narrower images are returned unchanged.
fn fit_width(image: DynamicImage, target_width: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width <= target_width {
        return image;
    }

    let scaled = u64::from(height) * u64::from(target_width) / u64::from(width);
    let new_height = u32::try_from(scaled).unwrap_or(u32::MAX).max(1);
    image.resize_exact(target_width, new_height, FilterType::Lanczos3)
}

fn encode(image: &DynamicImage, spec: &TransformSpec) -> Result<Vec<u8>, TransformError> {
    let mut buf = Vec::new();
    match spec.output_format() {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, spec.jpeg_quality())
                .write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ExtendedColorType::Rgb8,
                )
                .map_err(|e| TransformError::encode(e.to_string()))?;
        }
        OutputFormat::Png => {
            let rgba = image.to_rgba8();
            PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive)
                .write_image(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(|e| TransformError::encode(e.to_string()))?;
        }
    }
    Ok(buf)
}
