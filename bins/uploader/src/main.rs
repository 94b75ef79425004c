//! Picpost command line uploader.
//!
//! Usage:
//!   picpost upload --user <uuid> --file <path> [--mode gallery|camera]
//!                  [--width N] [--quality Q] [--format jpeg|png]
//!   picpost show --user <uuid>

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use picpost_core::media::{FileMediaSource, MediaMode};
use picpost_core::pipeline::{PipelineStages, PipelineState, UploadSession};
use picpost_core::profile::{DocumentStore, InMemoryDocumentStore, ProfileService};
use picpost_core::storage::{StorageConfig, StorageService};
use picpost_core::transfer::TransferService;
use picpost_core::transform::{ImageTransformer, OutputFormat, TransformSpec};
use picpost_db::DocumentRepository;
use picpost_shared::types::{RunId, UserId};
use picpost_shared::config::DatabaseConfig;
use picpost_shared::{AppConfig, AppError};

/// Upload a profile photo: resize, store, and record it on the user.
#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one upload for a user.
    Upload(UploadArgs),
    /// Print the image URL currently recorded for a user.
    Show {
        /// User ID.
        #[arg(long)]
        user: UserId,
    },
}

#[derive(clap::Args)]
struct UploadArgs {
    /// User ID the image belongs to.
    #[arg(long)]
    user: UserId,

    /// Image file to upload.
    #[arg(long)]
    file: PathBuf,

    /// Where the image came from.
    #[arg(long, default_value = "gallery", value_parser = parse_mode)]
    mode: MediaMode,

    /// Maximum output width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Encoder quality in (0, 1].
    #[arg(long)]
    quality: Option<f32>,

    /// Output format.
    #[arg(long, value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Create the user's document if it does not exist yet.
    #[arg(long)]
    create_document: bool,
}

fn parse_mode(s: &str) -> Result<MediaMode, String> {
    MediaMode::parse(s).ok_or_else(|| format!("unknown mode '{s}', expected gallery or camera"))
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::parse(s).ok_or_else(|| format!("unknown format '{s}', expected jpeg or png"))
}

/// Log filter used when `RUST_LOG` is unset. `picpost` matches every
/// workspace crate by target prefix.
const DEFAULT_LOG_FILTER: &str = "picpost=debug,opendal=warn";

/// Exit code for failures that are not an [`AppError`].
const EX_SOFTWARE: i32 = 70;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let app = err.downcast_ref::<AppError>();
            error!(
                code = app.map_or("INTERNAL_ERROR", AppError::error_code),
                "{err:#}"
            );
            let code = app.map_or(EX_SOFTWARE, AppError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load().map_err(AppError::from)?;

    match cli.command {
        Command::Upload(args) => {
            let store = document_store(&config).await?;
            upload(&config, store, args).await
        }
        Command::Show { user } => {
            // An in-memory store is empty at startup; there is nothing to show.
            let database = require_database(&config)?;
            let db = picpost_db::connect_with(database)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            let profile = ProfileService::new(
                Arc::new(DocumentRepository::new(db)),
                persist_timeout(&config),
            );
            match profile
                .current_image(user)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
            {
                Some(record) => println!("{}", record.image_url),
                None => info!(user_id = %user, "No image recorded"),
            }
            Ok(())
        }
    }
}

fn require_database(config: &AppConfig) -> Result<&DatabaseConfig, AppError> {
    config.database.as_ref().ok_or_else(|| {
        AppError::Config(
            "`show` reads recorded images from the database; configure [database]".to_string(),
        )
    })
}

/// The configured document store plus the means to create documents in it.
struct Documents {
    store: Arc<dyn DocumentStore>,
    create: DocumentCreator,
}

enum DocumentCreator {
    Memory(Arc<InMemoryDocumentStore>),
    Postgres(DocumentRepository),
}

impl Documents {
    async fn ensure(&self, user: UserId) -> Result<(), AppError> {
        match &self.create {
            DocumentCreator::Memory(store) => store.insert_user(user),
            DocumentCreator::Postgres(repo) => {
                if repo
                    .ensure_document(user)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?
                {
                    info!(user_id = %user, "Created user document");
                }
            }
        }
        Ok(())
    }
}

async fn document_store(config: &AppConfig) -> Result<Documents, AppError> {
    if let Some(database) = &config.database {
        let db = picpost_db::connect_with(database)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        info!("Connected to database");
        let repo = DocumentRepository::new(db);
        Ok(Documents {
            store: Arc::new(repo.clone()),
            create: DocumentCreator::Postgres(repo),
        })
    } else {
        warn!("No database configured, using an in-memory document store");
        let memory = Arc::new(InMemoryDocumentStore::new());
        Ok(Documents {
            store: memory.clone(),
            create: DocumentCreator::Memory(memory),
        })
    }
}

fn persist_timeout(config: &AppConfig) -> Duration {
    Duration::from_secs(config.pipeline.persist_timeout_secs)
}

fn transform_spec(config: &AppConfig, args: &UploadArgs) -> Result<TransformSpec, AppError> {
    let defaults = TransformSpec::try_from(&config.transform)
        .map_err(|e| AppError::Config(e.to_string()))?;
    TransformSpec::new(
        args.width.unwrap_or(defaults.target_width()),
        args.quality.unwrap_or(defaults.quality()),
        args.format.unwrap_or(defaults.output_format()),
    )
    .map_err(|e| AppError::Validation(e.to_string()))
}

async fn upload(config: &AppConfig, documents: Documents, args: UploadArgs) -> anyhow::Result<()> {
    let spec = transform_spec(config, &args)?;

    // In-memory documents never outlive the process, so always create one.
    if args.create_document || matches!(documents.create, DocumentCreator::Memory(_)) {
        documents.ensure(args.user).await?;
    }

    let storage = StorageService::from_config(StorageConfig::from_settings(&config.storage))
        .map_err(|e| AppError::Storage(e.to_string()))?;
    info!(
        provider = storage.provider_name(),
        bucket = storage.bucket(),
        "Object storage configured"
    );

    let stages = PipelineStages {
        media: Arc::new(FileMediaSource::new(&args.file)),
        transformer: ImageTransformer::new(Duration::from_secs(
            config.pipeline.transform_timeout_secs,
        )),
        transfer: TransferService::new(
            Arc::new(storage),
            Duration::from_secs(config.pipeline.transfer_timeout_secs),
        ),
        profile: ProfileService::new(documents.store, persist_timeout(config)),
    };
    let session = UploadSession::new(args.user, stages, spec);

    let run_id = RunId::new();
    let mut states = session
        .start_upload(run_id, args.mode, None)
        .map_err(|e| AppError::Pipeline(e.to_string()))?;

    let mut last = PipelineState::Idle;
    while let Some(state) = states.next().await {
        info!(run_id = %run_id, state = %state, "Pipeline state");
        last = state;
    }

    match last {
        PipelineState::Succeeded { url } => {
            println!("{url}");
            Ok(())
        }
        other => Err(AppError::Pipeline(other.to_string()))
            .with_context(|| format!("upload of {} did not complete", args.file.display())),
    }
}

#[cfg(test)]
mod tests {
    use picpost_shared::config::{
        PipelineSettings, StorageProvider, StorageSettings, TransformSettings,
    };

    use super::*;

    fn config(database: Option<DatabaseConfig>) -> AppConfig {
        AppConfig {
            storage: StorageSettings {
                provider: StorageProvider::Memory,
                public_base_url: Some("http://localhost:8080/avatars".to_string()),
                max_file_size: 1024,
                presign_download_ttl_secs: 60,
            },
            database,
            transform: TransformSettings::default(),
            pipeline: PipelineSettings::default(),
        }
    }

    #[test]
    fn test_show_refused_without_database() {
        let err = require_database(&config(None)).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn test_show_uses_configured_database() {
        let database = DatabaseConfig {
            url: "postgres://localhost/picpost".to_string(),
            max_connections: 2,
            min_connections: 1,
        };
        let config = config(Some(database));
        assert_eq!(
            require_database(&config).unwrap().url,
            "postgres://localhost/picpost"
        );
    }

    #[test]
    fn test_default_log_filter_parses() {
        let filter = tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).unwrap();
        assert!(filter.to_string().contains("picpost=debug"));
    }

    #[test]
    fn test_cli_parses_upload() {
        let cli = Cli::try_parse_from([
            "picpost",
            "upload",
            "--user",
            "0190a0b0-0000-7000-8000-000000000001",
            "--file",
            "me.png",
            "--format",
            "png",
        ])
        .unwrap();
        let Command::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.mode, MediaMode::Gallery);
        assert_eq!(args.format, Some(OutputFormat::Png));
    }
}
