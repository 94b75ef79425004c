//! Storage configuration types.

use picpost_shared::config::{StorageProvider, StorageSettings};

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
    /// Presigned download URL TTL in seconds.
    pub presign_download_ttl_secs: u64,
    /// Public base URL; objects resolve to `{base}/{key}` when set.
    pub public_base_url: Option<String>,
    /// Allowed MIME types for upload.
    pub allowed_mime_types: Vec<String>,
}

impl StorageConfig {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
    /// Default download TTL: 7 days.
    pub const DEFAULT_DOWNLOAD_TTL: u64 = 7 * 24 * 3600;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            presign_download_ttl_secs: Self::DEFAULT_DOWNLOAD_TTL,
            public_base_url: None,
            allowed_mime_types: Self::default_mime_types(),
        }
    }

    /// Build from the `storage` section of the application config.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        let config = Self::new(settings.provider.clone())
            .with_max_file_size(settings.max_file_size)
            .with_download_ttl(settings.presign_download_ttl_secs);
        match &settings.public_base_url {
            Some(base) => config.with_public_base_url(base.clone()),
            None => config,
        }
    }

    /// Set maximum file size.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set presigned download URL TTL.
    #[must_use]
    pub fn with_download_ttl(mut self, secs: u64) -> Self {
        self.presign_download_ttl_secs = secs;
        self
    }

    /// Serve objects from a public base URL instead of presigning.
    ///
    /// A trailing slash is ignored.
    #[must_use]
    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.public_base_url = Some(base.trim_end_matches('/').to_string());
        self
    }

    /// Set allowed MIME types.
    #[must_use]
    pub fn with_allowed_mime_types(mut self, types: Vec<String>) -> Self {
        self.allowed_mime_types = types;
        self
    }

    /// Default allowed MIME types: the transform stage's output formats.
    #[must_use]
    pub fn default_mime_types() -> Vec<String> {
        vec!["image/jpeg".to_string(), "image/png".to_string()]
    }

    /// Check if a MIME type is allowed.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.iter().any(|t| t == mime_type)
    }
}
