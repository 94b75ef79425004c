//! Storage service implementation using Apache OpenDAL.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use opendal::{Operator, services};
use picpost_shared::config::StorageProvider;
use tracing::debug;

use super::config::StorageConfig;
use super::error::StorageError;

/// Presigned URL for download.
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL.
    pub url: String,
    /// When the URL expires.
    pub expires_at: DateTime<Utc>,
}

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    /// Storage key.
    pub storage_key: String,
    /// Object size in bytes.
    pub file_size: u64,
    /// Content type, when the provider records one.
    pub content_type: Option<String>,
}

/// Storage service for uploaded images.
#[derive(Debug)]
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized, or if
    /// no public base URL is configured for a provider that cannot presign.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;

        // Every stored object must resolve to a URL.
        if config.public_base_url.is_none() && !operator.info().full_capability().presign_read {
            return Err(StorageError::configuration(format!(
                "provider '{}' cannot presign; set storage.public_base_url",
                config.provider.name()
            )));
        }

        Ok(Self { operator, config })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::Memory => Operator::new(services::Memory::default())
                .map_err(|e| StorageError::configuration(e.to_string()))?
                .finish()
                .pipe(Ok),
        }
    }

    /// Validate an upload against config constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if file size or MIME type is invalid.
    pub fn validate_upload(&self, content_type: &str, size: u64) -> Result<(), StorageError> {
        // Check file size
        if size > self.config.max_file_size {
            return Err(StorageError::file_too_large(
                size,
                self.config.max_file_size,
            ));
        }

        // Check MIME type
        if !self.config.is_mime_type_allowed(content_type) {
            return Err(StorageError::invalid_mime_type(content_type));
        }

        Ok(())
    }

    /// Write `bytes` at `key`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the provider rejects the write.
    pub async fn write(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        validate_key(key)?;
        self.validate_upload(content_type, bytes.len() as u64)?;

        // Providers without content-type support reject the option outright.
        if self
            .operator
            .info()
            .full_capability()
            .write_with_content_type
        {
            self.operator
                .write_with(key, bytes)
                .content_type(content_type)
                .await
                .map_err(StorageError::from)?;
        } else {
            self.operator
                .write(key, bytes)
                .await
                .map_err(StorageError::from)?;
        }
        Ok(())
    }

    /// Read a whole object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or cannot be read.
    pub async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        let buffer = self.operator.read(key).await.map_err(StorageError::from)?;
        Ok(buffer.to_bytes())
    }

    /// Generate presigned URL for download.
    ///
    /// # Errors
    ///
    /// Returns an error if presigning is not supported or fails.
    pub async fn presign_download(&self, key: &str) -> Result<PresignedUrl, StorageError> {
        let ttl = Duration::from_secs(self.config.presign_download_ttl_secs);

        let presigned = self
            .operator
            .presign_read(key, ttl)
            .await
            .map_err(StorageError::from)?;

        Ok(PresignedUrl {
            url: presigned.uri().to_string(),
            expires_at: chrono::TimeDelta::from_std(ttl)
                .ok()
                .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        })
    }

    /// URL under which `key` can be fetched.
    ///
    /// Uses the public base URL when configured, a presigned read URL
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if no public base is configured and the provider
    /// cannot presign.
    pub async fn access_url(&self, key: &str) -> Result<String, StorageError> {
        match &self.config.public_base_url {
            Some(base) => Ok(format!("{base}/{key}")),
            None => {
                let presigned = self.presign_download(key).await?;
                debug!(key, expires_at = %presigned.expires_at, "Presigned access URL");
                Ok(presigned.url)
            }
        }
    }

    /// Fetch the object behind a URL produced by [`Self::access_url`].
    ///
    /// Only public-base URLs can be mapped back to a key; presigned URLs
    /// are meant for HTTP clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not under the public base or the
    /// object cannot be read.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, StorageError> {
        let key = self
            .config
            .public_base_url
            .as_deref()
            .and_then(|base| url.strip_prefix(base))
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| StorageError::UnresolvableUrl(url.to_string()))?;
        self.read(key).await
    }

    /// Verify that an object exists and report its size.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or cannot be accessed.
    pub async fn stat(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let meta = self.operator.stat(key).await.map_err(StorageError::from)?;

        Ok(ObjectMetadata {
            storage_key: key.to_string(),
            file_size: meta.content_length(),
            content_type: meta.content_type().map(String::from),
        })
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.config.provider.bucket()
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Sanitize a filename for use in a storage key.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Extension trait for pipe operator.
trait Pipe: Sized {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

impl<T> Pipe for T {}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn memory_service() -> StorageService {
        let config =
            StorageConfig::new(StorageProvider::Memory).with_public_base_url("https://cdn.test");
        StorageService::from_config(config).expect("should create service")
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("avatar.jpeg"), "avatar.jpeg");
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_filename("日本語.png"), "___.png");
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("users/abc/1.jpeg").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/users/abc").is_err());
        assert!(validate_key("users//abc").is_err());
        assert!(validate_key("users/../abc").is_err());
        assert!(validate_key("users/abc/").is_err());
    }

    #[test]
    fn test_validate_upload_size() {
        let config = StorageConfig::new(StorageProvider::Memory)
            .with_public_base_url("https://cdn.test")
            .with_max_file_size(1024);
        let service = StorageService::from_config(config).expect("should create service");

        assert!(service.validate_upload("image/jpeg", 512).is_ok());

        let err = service.validate_upload("image/jpeg", 2048).unwrap_err();
        assert!(matches!(err, StorageError::FileTooLarge { .. }));
    }

    #[test]
    fn test_validate_upload_mime_type() {
        let service = memory_service();
        assert!(service.validate_upload("image/png", 1024).is_ok());

        let err = service
            .validate_upload("application/x-executable", 1024)
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidMimeType { .. }));
    }

    #[tokio::test]
    async fn test_write_stat_read_roundtrip() {
        let service = memory_service();
        let payload = Bytes::from_static(b"\xFF\xD8\xFFjpeg-ish");

        service
            .write("users/u1/a.jpeg", payload.clone(), "image/jpeg")
            .await
            .unwrap();

        let meta = service.stat("users/u1/a.jpeg").await.unwrap();
        assert_eq!(meta.file_size, payload.len() as u64);
        assert_eq!(service.read("users/u1/a.jpeg").await.unwrap(), payload);

    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let service = memory_service();
        service
            .write("users/u1/a.jpeg", Bytes::from_static(b"first"), "image/jpeg")
            .await
            .unwrap();
        service
            .write("users/u1/a.jpeg", Bytes::from_static(b"second!"), "image/jpeg")
            .await
            .unwrap();

        assert_eq!(
            service.read("users/u1/a.jpeg").await.unwrap(),
            Bytes::from_static(b"second!")
        );
    }

    #[tokio::test]
    async fn test_write_rejects_disallowed_type_before_io() {
        let service = memory_service();
        let err = service
            .write("users/u1/a.gif", Bytes::from_static(b"GIF89a"), "image/gif")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidMimeType { .. }));
        assert!(matches!(
            service.stat("users/u1/a.gif").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_access_url_and_fetch() {
        let service = memory_service();
        service
            .write("users/u1/b.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();

        let url = service.access_url("users/u1/b.png").await.unwrap();
        assert_eq!(url, "https://cdn.test/users/u1/b.png");
        assert_eq!(
            service.fetch(&url).await.unwrap(),
            Bytes::from_static(b"png")
        );
    }

    #[tokio::test]
    async fn test_fetch_foreign_url_fails() {
        let service = memory_service();
        let err = service
            .fetch("https://elsewhere.test/users/u1/b.png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnresolvableUrl(_)));
    }

    #[tokio::test]
    async fn test_stat_missing_object() {
        let service = memory_service();
        let err = service.stat("users/u1/missing.jpeg").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[rstest]
    #[case::memory(StorageProvider::Memory)]
    #[case::local_fs(StorageProvider::local_fs(std::env::temp_dir().join("picpost-no-presign")))]
    fn test_unresolvable_provider_rejected(#[case] provider: StorageProvider) {
        let err = StorageService::from_config(StorageConfig::new(provider)).unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)), "{err}");
    }

    #[tokio::test]
    async fn test_presigning_provider_needs_no_public_base() {
        let provider = StorageProvider::s3(
            "https://s3.test",
            "avatars",
            "access_key",
            "secret_key",
            "us-east-1",
        );
        let service = StorageService::from_config(StorageConfig::new(provider).with_download_ttl(60))
            .expect("s3 can presign");

        let url = service.access_url("users/u1/d.jpeg").await.unwrap();
        assert!(url.starts_with("https://s3.test/"), "{url}");
        assert!(url.contains("users/u1/d.jpeg"), "{url}");
        assert!(url.contains("X-Amz-Signature="), "{url}");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    // Size limit: anything above the configured maximum is rejected.
    proptest! {
        #[test]
        fn prop_file_size_validation(
            max_size in 1024u64..10_000_000,
            file_size in 0u64..20_000_000,
        ) {
            let config = StorageConfig::new(StorageProvider::Memory)
                .with_public_base_url("https://cdn.test")
                .with_max_file_size(max_size);
            let service = StorageService::from_config(config)
                .expect("should create service");

            let result = service.validate_upload("image/jpeg", file_size);

            if file_size <= max_size {
                prop_assert!(result.is_ok(), "Expected Ok for valid file size");
            } else {
                let is_too_large = matches!(result, Err(StorageError::FileTooLarge { .. }));
                prop_assert!(is_too_large, "Expected FileTooLarge error");
            }
        }
    }

    // Sanitized filenames only contain safe characters.
    proptest! {
        #[test]
        fn prop_sanitized_filename_safe_chars(filename in ".*") {
            let sanitized = sanitize_filename(&filename);

            for c in sanitized.chars() {
                let is_safe = c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_';
                prop_assert!(is_safe, "Unexpected character in sanitized filename: {}", c);
            }
        }
    }
}
