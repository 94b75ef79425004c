//! End-to-end upload scenarios against the filesystem and memory backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use picpost_core::media::{FileMediaSource, MediaMode, MediaSource, MemoryMediaSource};
use picpost_core::pipeline::{PipelineStages, PipelineState, Stage, UploadSession};
use picpost_core::profile::{InMemoryDocumentStore, ProfileService};
use picpost_core::storage::{
    ObjectMetadata, StorageConfig, StorageError, StorageProvider, StorageService,
};
use picpost_core::transfer::{ObjectStore, TransferService};
use picpost_core::transform::{ImageTransformer, OutputFormat, TransformSpec};
use picpost_shared::types::{RunId, UserId};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 90, 255]));
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            img.as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
    buf
}

fn stages(
    media: Arc<dyn MediaSource>,
    store: Arc<dyn ObjectStore>,
    documents: Arc<InMemoryDocumentStore>,
) -> PipelineStages {
    PipelineStages {
        media,
        transformer: ImageTransformer::default(),
        transfer: TransferService::new(store, TransferService::DEFAULT_TIMEOUT),
        profile: ProfileService::new(documents, ProfileService::DEFAULT_TIMEOUT),
    }
}

#[tokio::test]
async fn picked_file_lands_in_local_storage_and_profile() {
    let dir = tempfile::tempdir().unwrap();
    let picked = dir.path().join("picked.png");
    std::fs::write(&picked, png(200, 200)).unwrap();
    let bucket = dir.path().join("bucket");
    std::fs::create_dir(&bucket).unwrap();

    let storage = Arc::new(
        StorageService::from_config(
            StorageConfig::new(StorageProvider::local_fs(&bucket))
                .with_public_base_url("https://img.example.com/"),
        )
        .unwrap(),
    );
    let documents = Arc::new(InMemoryDocumentStore::new());
    let user = UserId::new();
    documents.insert_user(user);

    let session = UploadSession::new(
        user,
        stages(
            Arc::new(FileMediaSource::new(&picked)),
            storage.clone(),
            documents.clone(),
        ),
        TransformSpec::default(),
    );

    let spec = TransformSpec::new(100, 0.5, OutputFormat::Jpeg).unwrap();
    let states: Vec<_> = session
        .start_upload(RunId::new(), MediaMode::Gallery, Some(spec))
        .unwrap()
        .collect()
        .await;

    let Some(PipelineState::Succeeded { url }) = states.last() else {
        panic!("upload did not succeed: {states:?}");
    };
    let key = url
        .strip_prefix("https://img.example.com/")
        .expect("URL under the public base");
    assert!(key.starts_with(&format!("users/{user}/")));
    assert!(key.ends_with(".jpeg"));

    let on_disk = std::fs::read(bucket.join(key)).unwrap();
    let decoded = image::load_from_memory(&on_disk).unwrap();
    assert!(decoded.width() <= 100);

    let profile = ProfileService::new(documents, ProfileService::DEFAULT_TIMEOUT);
    let record = profile.current_image(user).await.unwrap().unwrap();
    assert_eq!(&record.image_url, url);
}

#[tokio::test]
async fn same_image_twice_resolves_to_same_object() {
    let storage = Arc::new(
        StorageService::from_config(
            StorageConfig::new(StorageProvider::Memory).with_public_base_url("https://cdn.test"),
        )
        .unwrap(),
    );
    let documents = Arc::new(InMemoryDocumentStore::new());
    let user = UserId::new();
    documents.insert_user(user);

    let session = UploadSession::new(
        user,
        stages(
            Arc::new(MemoryMediaSource::new(Some(Bytes::from(png(300, 120))))),
            storage.clone(),
            documents,
        ),
        TransformSpec::default(),
    );

    let mut urls = Vec::new();
    for _ in 0..2 {
        let states: Vec<_> = session
            .start_upload(RunId::new(), MediaMode::Camera, None)
            .unwrap()
            .collect()
            .await;
        match states.last() {
            Some(PipelineState::Succeeded { url }) => urls.push(url.clone()),
            other => panic!("unexpected end state {other:?}"),
        }
    }

    assert_eq!(urls[0], urls[1]);
    let bytes = storage.fetch(&urls[0]).await.unwrap();
    assert!(!bytes.is_empty());
}

/// Store that is offline until switched on.
struct Outage {
    inner: StorageService,
    online: AtomicBool,
}

#[async_trait]
impl ObjectStore for Outage {
    async fn write(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(StorageError::operation("network unreachable"));
        }
        self.inner.write(path, bytes, content_type).await
    }

    async fn stat(&self, path: &str) -> Result<ObjectMetadata, StorageError> {
        self.inner.stat(path).await
    }

    async fn resolve_url(&self, path: &str) -> Result<String, StorageError> {
        self.inner.access_url(path).await
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, StorageError> {
        self.inner.fetch(url).await
    }
}

#[tokio::test]
async fn retry_after_outage_stores_one_object() {
    let store = Arc::new(Outage {
        inner: StorageService::from_config(
            StorageConfig::new(StorageProvider::Memory).with_public_base_url("https://cdn.test"),
        )
        .unwrap(),
        online: AtomicBool::new(false),
    });
    let documents = Arc::new(InMemoryDocumentStore::new());
    let user = UserId::new();
    documents.insert_user(user);

    let session = UploadSession::new(
        user,
        stages(
            Arc::new(MemoryMediaSource::new(Some(Bytes::from(png(64, 64))))),
            store.clone(),
            documents.clone(),
        ),
        TransformSpec::default(),
    );

    let states: Vec<_> = session
        .start_upload(RunId::new(), MediaMode::Gallery, None)
        .unwrap()
        .collect()
        .await;
    assert!(matches!(
        states.last(),
        Some(PipelineState::Failed {
            stage: Stage::Uploading,
            ..
        })
    ));

    store.online.store(true, Ordering::SeqCst);
    let retried: Vec<_> = session.retry().unwrap().collect().await;
    let Some(PipelineState::Succeeded { url }) = retried.last() else {
        panic!("retry did not succeed: {retried:?}");
    };

    let key = url.strip_prefix("https://cdn.test/").unwrap();
    assert!(store.inner.stat(key).await.is_ok());

    let profile = ProfileService::new(documents, ProfileService::DEFAULT_TIMEOUT);
    assert_eq!(
        profile.current_image(user).await.unwrap().unwrap().image_url,
        *url
    );
}
