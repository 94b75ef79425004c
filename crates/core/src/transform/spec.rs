//! Transform parameters.

use std::fmt;

use picpost_shared::config::TransformSettings;
use serde::{Deserialize, Serialize};

use super::error::TransformError;

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Baseline JPEG.
    Jpeg,
    /// Lossless PNG; quality is ignored.
    Png,
}

impl OutputFormat {
    /// MIME type of the encoded payload.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// File extension used for derived filenames.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    /// Parses a format name (`jpeg`, `jpg`, `png`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Validated, immutable transform configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransformSpec {
    target_width: u32,
    quality: f32,
    output_format: OutputFormat,
}

impl TransformSpec {
    /// Default maximum width.
    pub const DEFAULT_TARGET_WIDTH: u32 = 500;
    /// Default encoder quality.
    pub const DEFAULT_QUALITY: f32 = 0.5;

    /// Creates a spec.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpec` if `target_width` is zero or `quality` is not
    /// in `(0, 1]`.
    pub fn new(
        target_width: u32,
        quality: f32,
        output_format: OutputFormat,
    ) -> Result<Self, TransformError> {
        if target_width == 0 {
            return Err(TransformError::invalid_spec("target width must be positive"));
        }
        if !(quality > 0.0 && quality <= 1.0) {
            return Err(TransformError::invalid_spec(format!(
                "quality {quality} is outside (0, 1]"
            )));
        }
        Ok(Self {
            target_width,
            quality,
            output_format,
        })
    }

    /// Maximum output width in pixels.
    #[must_use]
    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    /// Encoder quality in `(0, 1]`.
    #[must_use]
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Output format.
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Quality on the JPEG encoder's 1..=100 scale.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn jpeg_quality(&self) -> u8 {
        // quality is validated to (0, 1], so the product fits in u8
        ((self.quality * 100.0).round() as u8).clamp(1, 100)
    }
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            target_width: Self::DEFAULT_TARGET_WIDTH,
            quality: Self::DEFAULT_QUALITY,
            output_format: OutputFormat::Jpeg,
        }
    }
}

impl TryFrom<&TransformSettings> for TransformSpec {
    type Error = TransformError;

    fn try_from(settings: &TransformSettings) -> Result<Self, Self::Error> {
        let format = OutputFormat::parse(&settings.output_format).ok_or_else(|| {
            TransformError::invalid_spec(format!(
                "unknown output format '{}'",
                settings.output_format
            ))
        })?;
        Self::new(settings.target_width, settings.quality, format)
    }
}
