//! Application configuration management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Object storage configuration.
    pub storage: StorageSettings,
    /// Document database configuration. Without it an in-memory store is used.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Default transform applied when a caller does not supply one.
    #[serde(default)]
    pub transform: TransformSettings,
    /// Per-stage budgets for the upload pipeline.
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// In-process memory (tests and dry runs)
    Memory,
}

impl StorageProvider {
    /// Create S3-compatible provider (Cloudflare R2, Supabase, AWS S3).
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Create Azure Blob Storage provider.
    #[must_use]
    pub fn azure_blob(
        account: impl Into<String>,
        access_key: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::AzureBlob {
            account: account.into(),
            access_key: access_key.into(),
            container: container.into(),
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Get the provider name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local",
            Self::Memory => "memory",
        }
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::S3 { bucket, .. } => bucket,
            Self::AzureBlob { container, .. } => container,
            Self::LocalFs { root } => root.to_str().unwrap_or("local"),
            Self::Memory => "memory",
        }
    }
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Which backend to talk to.
    pub provider: StorageProvider,
    /// Base URL under which stored objects are publicly readable.
    ///
    /// When unset, access URLs are presigned read URLs.
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Maximum object size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Presigned download URL TTL in seconds.
    #[serde(default = "default_download_ttl")]
    pub presign_download_ttl_secs: u64,
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_download_ttl() -> u64 {
    7 * 24 * 3600 // presign ceiling on S3
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Default transform parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformSettings {
    /// Maximum output width in pixels.
    #[serde(default = "default_target_width")]
    pub target_width: u32,
    /// Encoder quality in `(0, 1]`.
    #[serde(default = "default_quality")]
    pub quality: f32,
    /// Output format name (`jpeg` or `png`).
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

fn default_target_width() -> u32 {
    500
}

fn default_quality() -> f32 {
    0.5
}

fn default_output_format() -> String {
    "jpeg".to_string()
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            target_width: default_target_width(),
            quality: default_quality(),
            output_format: default_output_format(),
        }
    }
}

/// Per-stage time budgets.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// CPU budget for decoding, resizing and encoding.
    #[serde(default = "default_transform_timeout")]
    pub transform_timeout_secs: u64,
    /// Network timeout for writing and confirming the object.
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_secs: u64,
    /// Network timeout for the record write.
    #[serde(default = "default_persist_timeout")]
    pub persist_timeout_secs: u64,
}

fn default_transform_timeout() -> u64 {
    30
}

fn default_transfer_timeout() -> u64 {
    120
}

fn default_persist_timeout() -> u64 {
    15
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            transform_timeout_secs: default_transform_timeout(),
            transfer_timeout_secs: default_transfer_timeout(),
            persist_timeout_secs: default_persist_timeout(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `PICPOST__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        Self::load_from(Path::new("config"), &run_mode)
    }

    /// Loads `{dir}/default` and `{dir}/{run_mode}`, then the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load_from(dir: &Path, run_mode: &str) -> Result<Self, config::ConfigError> {
        let file = |name: &str| {
            config::File::from(dir.join(name))
                .format(config::FileFormat::Toml)
                .required(false)
        };

        let config = config::Config::builder()
            .add_source(file("default.toml"))
            .add_source(file(&format!("{run_mode}.toml")))
            .add_source(config::Environment::with_prefix("PICPOST").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
