//! Asset-creation state machine.
//!
//! One [`AssetPipeline`] drives a single event draft from free text to a
//! submitted `createEvent` transaction:
//!
//! ```text
//! Idle ──image acquired──▶ ImageReady ──uploaded──▶ Uploaded
//!      ──metadata published──▶ MetadataReady ──▶ Submitting ──▶ Done
//! ```
//!
//! Stages may be invoked separately; sequencing is enforced by data presence
//! (an upload needs image bytes, metadata needs the uploaded URI, submission
//! needs the metadata URI), never by implicit ordering assumptions.  The
//! stage enum exists for progress reporting and is *not* a resumability
//! checkpoint: a failed stage moves the machine to `Failed` and the run
//! restarts from image acquisition or upload, while the draft's text fields
//! are preserved so the user can retry.

use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use pof_chain::{MutationError, RouterWriter, TxReceipt};
use pof_common::{is_valid_url, WalletAddress};

use crate::{
    generator::{friendship_prompt, GeneratedImage, GeneratorError, ImageGenerator},
    metadata::{sha256_hex, EventMetadataDoc, MetadataError, MetadataPublisher},
    store::{ContentStore, StoreError, StoredFile},
};

/// How many published metadata documents to memoize per pipeline.
const METADATA_CACHE_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Caught before any network call; surfaced inline next to the field.
    #[error("validation error: {0}")]
    Validation(String),

    /// A stage was invoked before its prerequisite produced a result.
    #[error("sequencing error: {0}")]
    Sequence(String),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Submit(#[from] MutationError),
}

/// Progress position of the draft, for user feedback only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftStage {
    #[default]
    Idle,
    ImageReady,
    Uploaded,
    MetadataReady,
    Submitting,
    Done,
    Failed,
}

impl DraftStage {
    /// Monotonic percentage shown to the user:
    /// preparing → uploading image → building metadata → uploading metadata
    /// → complete.
    pub fn progress(self) -> u8 {
        match self {
            Self::Idle | Self::Failed => 0,
            Self::ImageReady => 25,
            Self::Uploaded => 50,
            Self::MetadataReady | Self::Submitting => 75,
            Self::Done => 100,
        }
    }
}

/// Where the draft's image currently comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum ImageSource {
    #[default]
    None,
    /// User-supplied ready-made URL; no upload needed.
    Url(String),
    /// AI-generated bytes held in memory until uploaded.
    Generated {
        image: GeneratedImage,
        preview: String,
        fingerprint: String,
    },
}

/// Transient, in-memory event draft.  Discarded on success or navigation;
/// nothing here is persisted.
#[derive(Debug, Default)]
pub struct AssetDraft {
    pub name: String,
    pub description: String,
    pub event_type: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,

    image: ImageSource,
    uploaded_image_uri: Option<String>,
    uploaded_fingerprint: Option<String>,
    metadata_uri: Option<String>,
    stage: DraftStage,
    last_error: Option<String>,
}

impl AssetDraft {
    pub fn stage(&self) -> DraftStage {
        self.stage
    }

    pub fn progress(&self) -> u8 {
        self.stage.progress()
    }

    /// Displayable preview of a generated image (`data:` URI).
    pub fn preview(&self) -> Option<&str> {
        match &self.image {
            ImageSource::Generated { preview, .. } => Some(preview),
            _ => None,
        }
    }

    pub fn uploaded_image_uri(&self) -> Option<&str> {
        self.uploaded_image_uri.as_deref()
    }

    pub fn metadata_uri(&self) -> Option<&str> {
        self.metadata_uri.as_deref()
    }

    /// Most recent user-visible failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Orchestrates the three asset stages against the injected ports.
pub struct AssetPipeline {
    store: Arc<dyn ContentStore>,
    generator: Option<Arc<dyn ImageGenerator>>,
    publisher: MetadataPublisher,
    draft: AssetDraft,
}

impl AssetPipeline {
    /// `generator` is `None` when no API credential is configured; requesting
    /// generation then surfaces a configuration error instead of silently
    /// falling back.
    pub fn new(store: Arc<dyn ContentStore>, generator: Option<Arc<dyn ImageGenerator>>) -> Self {
        let cache_size = NonZeroUsize::new(METADATA_CACHE_SIZE)
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            publisher: MetadataPublisher::new(Arc::clone(&store), cache_size),
            store,
            generator,
            draft: AssetDraft::default(),
        }
    }

    pub fn draft(&self) -> &AssetDraft {
        &self.draft
    }

    /// Mutable access to the draft's text fields.
    pub fn draft_mut(&mut self) -> &mut AssetDraft {
        &mut self.draft
    }

    /// Discard the draft entirely and return to `Idle`.
    pub fn reset(&mut self) {
        self.draft = AssetDraft::default();
    }

    /// Stage A, manual path: accept a ready-made image URL.
    ///
    /// A plain URL needs no upload, so the draft jumps straight to
    /// `Uploaded`; any previously generated bytes are dropped.
    pub fn set_image_url(&mut self, raw: &str) -> Result<(), PipelineError> {
        let url = raw.trim();
        if !is_valid_url(url) {
            return Err(PipelineError::Validation(format!(
                "not a valid image URL: {url:?}"
            )));
        }
        self.draft.image = ImageSource::Url(url.to_owned());
        self.draft.uploaded_image_uri = Some(url.to_owned());
        self.draft.uploaded_fingerprint = None;
        self.draft.metadata_uri = None;
        self.draft.last_error = None;
        self.draft.stage = DraftStage::Uploaded;
        Ok(())
    }

    /// Stage A, generated path: produce image bytes from the draft's name
    /// and description.
    ///
    /// On any failure the draft is left byte-for-byte in its prior state –
    /// only `last_error` is recorded.
    #[instrument(skip(self), fields(name = %self.draft.name))]
    pub async fn generate_image(&mut self) -> Result<(), PipelineError> {
        let name = self.draft.name.trim().to_owned();
        let description = self.draft.description.trim().to_owned();
        if name.is_empty() || description.is_empty() {
            return Err(PipelineError::Validation(
                "event name and description are required for image generation".into(),
            ));
        }

        let Some(generator) = self.generator.clone() else {
            let err = GeneratorError::MissingCredential;
            self.draft.last_error = Some(err.to_string());
            return Err(err.into());
        };

        let prompt = friendship_prompt(&name, &description);
        match generator.generate(&prompt).await {
            Ok(image) => {
                let fingerprint = sha256_hex(&image.bytes);
                let preview = image.to_data_uri();
                self.draft.image = ImageSource::Generated {
                    image,
                    preview,
                    fingerprint,
                };
                // The upload record stays; upload_image compares fingerprints
                // and re-uploads only if the bytes actually changed.
                self.draft.metadata_uri = None;
                self.draft.last_error = None;
                self.draft.stage = DraftStage::ImageReady;
                info!("image generated");
                Ok(())
            }
            Err(err) => {
                self.draft.last_error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Stage B: push generated bytes to content-addressed storage.
    ///
    /// Idempotent per distinct image: re-invoking for the same unchanged
    /// bytes performs no new upload and returns the recorded URI.  A plain
    /// URL image short-circuits entirely.
    #[instrument(skip(self))]
    pub async fn upload_image(&mut self) -> Result<String, PipelineError> {
        let (image, fingerprint) = match &self.draft.image {
            ImageSource::None => {
                return Err(PipelineError::Sequence(
                    "no image acquired yet; generate one or supply a URL".into(),
                ))
            }
            ImageSource::Url(url) => return Ok(url.clone()),
            ImageSource::Generated {
                image, fingerprint, ..
            } => (image.clone(), fingerprint.clone()),
        };

        if let (Some(uri), Some(uploaded)) = (
            &self.draft.uploaded_image_uri,
            &self.draft.uploaded_fingerprint,
        ) {
            if *uploaded == fingerprint {
                info!(uri, "image already uploaded; skipping");
                return Ok(uri.clone());
            }
        }

        let file = StoredFile::new("ai-generated-image.png", image.mime.clone(), image.bytes);
        match self.store.upload(&[file]).await {
            Ok(uri) => {
                self.draft.uploaded_image_uri = Some(uri.clone());
                self.draft.uploaded_fingerprint = Some(fingerprint);
                self.draft.last_error = None;
                self.draft.stage = DraftStage::Uploaded;
                info!(uri, "image uploaded");
                Ok(uri)
            }
            Err(err) => {
                self.draft.last_error = Some(err.to_string());
                self.draft.stage = DraftStage::Failed;
                Err(err.into())
            }
        }
    }

    /// Stage C: build the metadata document and upload it.
    ///
    /// Refuses to run until Stage B produced an image URI.  The creator
    /// attribute is always the connected wallet.
    #[instrument(skip(self, creator), fields(creator = %creator))]
    pub async fn publish_metadata(
        &mut self,
        creator: &WalletAddress,
    ) -> Result<String, PipelineError> {
        let image_uri = self.draft.uploaded_image_uri.clone().ok_or_else(|| {
            PipelineError::Sequence("image must be uploaded before metadata can be built".into())
        })?;

        let doc = EventMetadataDoc::build(
            &self.draft.name,
            &self.draft.description,
            &image_uri,
            self.draft.event_type.as_deref(),
            self.draft.date.as_deref(),
            self.draft.location.as_deref(),
            creator,
        );

        match self.publisher.publish(&doc).await {
            Ok(uri) => {
                self.draft.metadata_uri = Some(uri.clone());
                self.draft.last_error = None;
                self.draft.stage = DraftStage::MetadataReady;
                info!(uri, "metadata published");
                Ok(uri)
            }
            Err(err) => {
                self.draft.last_error = Some(err.to_string());
                self.draft.stage = DraftStage::Failed;
                Err(err.into())
            }
        }
    }

    /// Final step: submit `createEvent` with the published metadata URI.
    ///
    /// Refuses to run until Stage C recorded a URI.  A chain failure moves
    /// the machine to `Failed`; the submission itself follows the write-side
    /// lifecycle (single attempt, success only after confirmation).
    #[instrument(skip(self, writer))]
    pub async fn submit_create_event(
        &mut self,
        writer: &RouterWriter,
    ) -> Result<TxReceipt, PipelineError> {
        let metadata_uri = self.draft.metadata_uri.clone().ok_or_else(|| {
            PipelineError::Sequence("metadata must be uploaded before submission".into())
        })?;

        self.draft.stage = DraftStage::Submitting;
        match writer
            .create_event(&self.draft.name, &self.draft.description, &metadata_uri)
            .await
        {
            Ok(receipt) => {
                self.draft.stage = DraftStage::Done;
                info!(block = receipt.block_number, "event created");
                Ok(receipt)
            }
            Err(err) => {
                self.draft.last_error = Some(err.to_string());
                self.draft.stage = DraftStage::Failed;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct CountingStore {
        uploads: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                uploads: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ContentStore for CountingStore {
        async fn upload(&self, _files: &[StoredFile]) -> Result<String, StoreError> {
            let id = self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(format!("ipfs://upload{id}"))
        }
    }

    /// Succeeds with the configured bytes until `fail` is flipped.
    struct FlakyGenerator {
        bytes: std::sync::Mutex<Vec<u8>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl ImageGenerator for FlakyGenerator {
        async fn generate(&self, _prompt: &str) -> Result<GeneratedImage, GeneratorError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(GeneratorError::Service("simulated network failure".into()));
            }
            Ok(GeneratedImage {
                bytes: self.bytes.lock().unwrap().clone(),
                mime: "image/png".into(),
            })
        }
    }

    fn pipeline_with(
        generator: Option<Arc<dyn ImageGenerator>>,
    ) -> (AssetPipeline, Arc<CountingStore>) {
        let store = CountingStore::new();
        let mut pipeline = AssetPipeline::new(store.clone(), generator);
        pipeline.draft_mut().name = "Summer BBQ".into();
        pipeline.draft_mut().description = "A fun day".into();
        (pipeline, store)
    }

    fn flaky(bytes: &[u8]) -> Arc<FlakyGenerator> {
        Arc::new(FlakyGenerator {
            bytes: std::sync::Mutex::new(bytes.to_vec()),
            fail: AtomicBool::new(false),
        })
    }

    #[test]
    fn progress_is_monotonic_across_the_happy_path() {
        let order = [
            DraftStage::Idle,
            DraftStage::ImageReady,
            DraftStage::Uploaded,
            DraftStage::MetadataReady,
            DraftStage::Submitting,
            DraftStage::Done,
        ];
        let mut last = 0;
        for stage in order {
            assert!(stage.progress() >= last, "{stage:?} regressed");
            last = stage.progress();
        }
        assert_eq!(DraftStage::Done.progress(), 100);
    }

    #[tokio::test]
    async fn repeat_upload_of_unchanged_image_is_a_noop() {
        let generator = flaky(b"image-bytes");
        let (mut pipeline, store) = pipeline_with(Some(generator));

        pipeline.generate_image().await.unwrap();
        let first = pipeline.upload_image().await.unwrap();
        let second = pipeline.upload_image().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn regeneration_with_identical_bytes_still_skips_upload() {
        let generator = flaky(b"first");
        let (mut pipeline, store) = pipeline_with(Some(generator.clone()));

        pipeline.generate_image().await.unwrap();
        let _ = pipeline.upload_image().await.unwrap();

        pipeline.generate_image().await.unwrap();
        let _ = pipeline.upload_image().await.unwrap();
        assert_eq!(store.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn changed_bytes_trigger_a_fresh_upload() {
        let generator = flaky(b"first");
        let (mut pipeline, store) = pipeline_with(Some(generator.clone()));

        pipeline.generate_image().await.unwrap();
        let _ = pipeline.upload_image().await.unwrap();

        *generator.bytes.lock().unwrap() = b"second".to_vec();
        pipeline.generate_image().await.unwrap();
        let _ = pipeline.upload_image().await.unwrap();
        assert_eq!(store.uploads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_generation_preserves_the_draft() {
        let generator = flaky(b"good-bytes");
        let (mut pipeline, _) = pipeline_with(Some(generator.clone()));

        pipeline.generate_image().await.unwrap();
        let preview_before = pipeline.draft().preview().map(str::to_owned);
        let stage_before = pipeline.draft().stage();

        generator.fail.store(true, Ordering::SeqCst);
        let err = pipeline.generate_image().await.unwrap_err();
        assert!(matches!(err, PipelineError::Generator(GeneratorError::Service(_))));

        assert_eq!(pipeline.draft().preview().map(str::to_owned), preview_before);
        assert_eq!(pipeline.draft().stage(), stage_before);
        assert!(pipeline.draft().last_error().is_some());
    }

    #[tokio::test]
    async fn missing_credential_is_a_surfaced_error() {
        let (mut pipeline, store) = pipeline_with(None);

        let err = pipeline.generate_image().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Generator(GeneratorError::MissingCredential)
        ));
        assert!(pipeline.draft().last_error().is_some());
        assert_eq!(store.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_requires_name_and_description() {
        let generator = flaky(b"bytes");
        let (mut pipeline, _) = pipeline_with(Some(generator));
        pipeline.draft_mut().description = String::new();

        let err = pipeline.generate_image().await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn manual_url_path_skips_upload() {
        let (mut pipeline, store) = pipeline_with(None);

        pipeline
            .set_image_url("https://example.com/pic.png")
            .unwrap();
        let uri = pipeline.upload_image().await.unwrap();

        assert_eq!(uri, "https://example.com/pic.png");
        assert_eq!(store.uploads.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.draft().stage(), DraftStage::Uploaded);
    }

    #[tokio::test]
    async fn malformed_url_is_rejected() {
        let (mut pipeline, _) = pipeline_with(None);
        let err = pipeline.set_image_url("not a url").unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn metadata_refuses_to_run_before_upload() {
        let (mut pipeline, _) = pipeline_with(None);
        let creator =
            WalletAddress::parse("0x1111111111111111111111111111111111111111").unwrap();

        let err = pipeline.publish_metadata(&creator).await.unwrap_err();
        assert!(matches!(err, PipelineError::Sequence(_)));
    }

    #[tokio::test]
    async fn upload_refuses_to_run_before_image_acquisition() {
        let (mut pipeline, _) = pipeline_with(None);
        let err = pipeline.upload_image().await.unwrap_err();
        assert!(matches!(err, PipelineError::Sequence(_)));
    }
}
