//! The capture flow: compress, fingerprint, then replay or analyze.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::config::CaptureConfig;
use super::source::{ImageSource, PickOutcome, PickSource, PickedImage};
use super::state::CaptureState;
use crate::analyzer::{FoodAnalyzer, ImageUpload};
use crate::error::{CaptureError, ValidationError};
use crate::fingerprint::{fingerprint_file, Fingerprint};
use crate::image::{ImageHandle, ImageSizeReducer, ImageTransform};
use crate::store::DietEntryStore;
use crate::types::DietEntry;

/// User input that accompanies a photo.
#[derive(Debug, Clone)]
pub struct CaptureDraft {
    pub title: String,
    pub captured_at: DateTime<Utc>,
}

impl CaptureDraft {
    /// A draft dated now.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            captured_at: Utc::now(),
        }
    }

    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }
}

/// How a successful capture ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// A new entry was analyzed and stored.
    Created(DietEntry),
    /// The photo had been analyzed before; this is the stored entry, untouched.
    Replayed(DietEntry),
}

impl CaptureOutcome {
    pub fn entry(&self) -> &DietEntry {
        match self {
            CaptureOutcome::Created(entry) | CaptureOutcome::Replayed(entry) => entry,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, CaptureOutcome::Replayed(_))
    }
}

/// Drives one capture at a time against an owned entry store.
///
/// Every operation takes `&mut self`, so a flow's steps run strictly in order
/// and the store has a single writer.
pub struct CaptureCoordinator<T> {
    reducer: ImageSizeReducer<T>,
    analyzer: Arc<dyn FoodAnalyzer>,
    store: DietEntryStore,
    config: CaptureConfig,
    state: CaptureState,
    selected: Option<PickedImage>,
    history: Vec<CaptureState>,
}

impl<T: ImageTransform> CaptureCoordinator<T> {
    pub fn new(
        reducer: ImageSizeReducer<T>,
        analyzer: Arc<dyn FoodAnalyzer>,
        store: DietEntryStore,
        config: CaptureConfig,
    ) -> Self {
        Self {
            reducer,
            analyzer,
            store,
            config,
            state: CaptureState::Idle,
            selected: None,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// States entered since an image was last chosen or the flow was reset, in
    /// order. Resubmitting the same image appends to it.
    pub fn history(&self) -> &[CaptureState] {
        &self.history
    }

    pub fn selected_image(&self) -> Option<&PickedImage> {
        self.selected.as_ref()
    }

    pub fn store(&self) -> &DietEntryStore {
        &self.store
    }

    pub fn into_store(self) -> DietEntryStore {
        self.store
    }

    /// Ask `source` for a photo.
    ///
    /// A cancel returns the flow to `Idle`. A refused permission fails the
    /// flow before anything was selected.
    pub async fn select_image<S: ImageSource + ?Sized>(
        &mut self,
        source: &S,
        kind: PickSource,
    ) -> Result<(), CaptureError> {
        match source.pick(kind).await {
            Ok(PickOutcome::Selected(image)) => {
                self.choose_image(image);
                Ok(())
            }
            Ok(PickOutcome::Canceled) => {
                tracing::debug!("image pick canceled");
                self.reset();
                Ok(())
            }
            Err(err) => {
                self.selected = None;
                let err = CaptureError::from(err);
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Use an already picked photo.
    pub fn choose_image(&mut self, image: PickedImage) {
        self.history.clear();
        self.selected = Some(image);
        self.transition(CaptureState::ImageSelected);
    }

    /// Drop any selection and go back to `Idle`.
    pub fn reset(&mut self) {
        self.history.clear();
        self.selected = None;
        self.transition(CaptureState::Idle);
    }

    /// Run the pipeline for the selected photo.
    ///
    /// Validation problems are returned without touching the state. Any other
    /// error moves the flow to `Failed` and leaves the store as it was.
    pub async fn submit(&mut self, draft: CaptureDraft) -> Result<CaptureOutcome, CaptureError> {
        let image = self.validate(&draft)?;

        let span = info_span!("capture", title = %draft.title, image = %image.path.display());
        match self.run(&draft, &image).instrument(span).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::warn!(error = %err, "capture failed");
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn validate(&self, draft: &CaptureDraft) -> Result<PickedImage, ValidationError> {
        let image = self.selected.clone().ok_or(ValidationError::MissingImage)?;
        if draft.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        Ok(image)
    }

    async fn run(
        &mut self,
        draft: &CaptureDraft,
        image: &PickedImage,
    ) -> Result<CaptureOutcome, CaptureError> {
        self.transition(CaptureState::Compressing);
        let reduction = self
            .reducer
            .reduce(&image.handle(), self.config.max_image_bytes)?;

        let result = self.record(draft, &reduction.image).await;

        // The reduced artifact survives only as the location of a new entry
        let kept = matches!(
            &result,
            Ok(CaptureOutcome::Created(entry)) if entry.image_location == reduction.image.path
        );
        if reduction.was_reduced() && !kept {
            self.reducer.transform().discard(&reduction.image);
        }
        result
    }

    /// Fingerprint the compressed image, then replay or analyze and store it.
    async fn record(
        &mut self,
        draft: &CaptureDraft,
        image: &ImageHandle,
    ) -> Result<CaptureOutcome, CaptureError> {
        self.transition(CaptureState::Fingerprinting);
        let (fingerprint, bytes) = fingerprint_file(&image.path).await?;

        if let Some(existing) = self.store.find_by_fingerprint(&fingerprint).cloned() {
            self.transition(CaptureState::LookupHit);
            tracing::info!(entry_id = %existing.id, %fingerprint, "image already analyzed, replaying saved entry");
            self.transition(CaptureState::EntryReplayed {
                entry_id: existing.id,
            });
            return Ok(CaptureOutcome::Replayed(existing));
        }

        self.transition(CaptureState::LookupMiss);
        self.transition(CaptureState::Analyzing);
        let upload = ImageUpload::from_path(&image.path, bytes);
        let analysis = self.analyzer.analyze(&upload).await?;

        let image_location = self.place_image(image, &fingerprint, &upload).await?;

        let entry = DietEntry {
            id: Uuid::new_v4(),
            image_location,
            fingerprint,
            title: draft.title.trim().to_string(),
            captured_at: draft.captured_at,
            analysis,
        };

        if let Err(err) = self.store.commit(entry.clone()) {
            if self.config.media_dir.is_some() {
                let _ = tokio::fs::remove_file(&entry.image_location).await;
            }
            return Err(err.into());
        }

        tracing::info!(entry_id = %entry.id, fingerprint = %entry.fingerprint, "created diet entry");
        self.transition(CaptureState::EntryCreated { entry_id: entry.id });
        Ok(CaptureOutcome::Created(entry))
    }

    /// Copy the final photo into the media directory, if one is configured.
    async fn place_image(
        &self,
        image: &ImageHandle,
        fingerprint: &Fingerprint,
        upload: &ImageUpload,
    ) -> Result<PathBuf, CaptureError> {
        let Some(media_dir) = &self.config.media_dir else {
            return Ok(image.path.clone());
        };

        let extension = Path::new(&upload.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg");
        let destination = media_dir.join(format!("{}.{}", fingerprint, extension));

        tokio::fs::create_dir_all(media_dir).await?;
        tokio::fs::copy(&image.path, &destination).await?;

        Ok(destination)
    }

    fn fail(&mut self, err: &CaptureError) {
        self.transition(CaptureState::Failed {
            reason: err.to_string(),
        });
    }

    fn transition(&mut self, next: CaptureState) {
        tracing::debug!(from = %self.state, to = %next, "capture state");
        self.history.push(next.clone());
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::FakeAnalyzer;
    use crate::capture::StaticImageSource;
    use crate::image::FakeTransform;

    struct Fixture {
        _dir: tempfile::TempDir,
        photo: PickedImage,
        analyzer: Arc<FakeAnalyzer>,
        coordinator: CaptureCoordinator<FakeTransform>,
    }

    /// A 1MB photo that already fits the default budget.
    fn fixture(analyzer: FakeAnalyzer) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meal.jpg");
        std::fs::write(&path, b"small meal photo").unwrap();

        let transform = FakeTransform::new(dir.path().join("work"), |w| u64::from(w) * 1000)
            .with_size(&path, 1_000_000);
        let analyzer = Arc::new(analyzer);
        let coordinator = CaptureCoordinator::new(
            ImageSizeReducer::new(transform),
            analyzer.clone(),
            DietEntryStore::in_memory(),
            CaptureConfig::default(),
        );

        Fixture {
            photo: PickedImage::new(path, 1200, 900),
            _dir: dir,
            analyzer,
            coordinator,
        }
    }

    #[tokio::test]
    async fn test_empty_title_is_a_validation_error() {
        let mut f = fixture(FakeAnalyzer::pasta());
        f.coordinator.choose_image(f.photo.clone());

        let err = f.coordinator.submit(CaptureDraft::new("   ")).await.unwrap_err();

        assert!(matches!(
            err,
            CaptureError::Validation(ValidationError::MissingTitle)
        ));
        assert!(err.is_validation());
        assert_eq!(f.coordinator.state(), &CaptureState::ImageSelected);
        assert_eq!(f.analyzer.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_image_is_a_validation_error() {
        let mut f = fixture(FakeAnalyzer::pasta());

        let err = f.coordinator.submit(CaptureDraft::new("Lunch")).await.unwrap_err();

        assert!(matches!(
            err,
            CaptureError::Validation(ValidationError::MissingImage)
        ));
        assert_eq!(f.coordinator.state(), &CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_new_capture_walks_every_state() {
        let mut f = fixture(FakeAnalyzer::pasta());
        f.coordinator.choose_image(f.photo.clone());

        let outcome = f.coordinator.submit(CaptureDraft::new("Lunch")).await.unwrap();
        let entry = outcome.entry().clone();

        assert!(!outcome.is_replay());
        assert_eq!(
            f.coordinator.history(),
            &[
                CaptureState::ImageSelected,
                CaptureState::Compressing,
                CaptureState::Fingerprinting,
                CaptureState::LookupMiss,
                CaptureState::Analyzing,
                CaptureState::EntryCreated { entry_id: entry.id },
            ]
        );
        assert_eq!(entry.image_location, f.photo.path);
        assert_eq!(f.coordinator.store().len(), 1);
    }

    #[tokio::test]
    async fn test_analysis_failure_leaves_store_untouched() {
        let mut f = fixture(FakeAnalyzer::failing(503));
        f.coordinator.choose_image(f.photo.clone());

        let err = f.coordinator.submit(CaptureDraft::new("Lunch")).await.unwrap_err();

        assert!(matches!(err, CaptureError::AnalysisFailed(_)));
        assert!(matches!(f.coordinator.state(), CaptureState::Failed { .. }));
        assert!(f.coordinator.store().is_empty());

        // Retry starts over from idle
        f.coordinator.reset();
        assert_eq!(f.coordinator.state(), &CaptureState::Idle);
        assert!(f.coordinator.selected_image().is_none());
    }

    #[tokio::test]
    async fn test_resubmit_appends_to_history() {
        let mut f = fixture(FakeAnalyzer::failing(500));
        f.coordinator.choose_image(f.photo.clone());

        f.coordinator.submit(CaptureDraft::new("Lunch")).await.unwrap_err();
        f.coordinator.submit(CaptureDraft::new("Lunch")).await.unwrap_err();

        let history = f.coordinator.history();
        assert_eq!(history[0], CaptureState::ImageSelected);
        let failures = history
            .iter()
            .filter(|s| matches!(s, CaptureState::Failed { .. }))
            .count();
        assert_eq!(failures, 2);
        assert_eq!(f.analyzer.calls(), 2);

        f.coordinator.choose_image(f.photo.clone());
        assert_eq!(f.coordinator.history(), &[CaptureState::ImageSelected]);
    }

    #[tokio::test]
    async fn test_cancel_returns_to_idle() {
        let mut f = fixture(FakeAnalyzer::pasta());
        f.coordinator.choose_image(f.photo.clone());

        f.coordinator
            .select_image(&StaticImageSource::canceled(), PickSource::Library)
            .await
            .unwrap();

        assert_eq!(f.coordinator.state(), &CaptureState::Idle);
        assert!(f.coordinator.selected_image().is_none());
    }

    #[tokio::test]
    async fn test_permission_denied_fails_before_selection() {
        let mut f = fixture(FakeAnalyzer::pasta());

        let err = f
            .coordinator
            .select_image(&StaticImageSource::denied(), PickSource::Camera)
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::PermissionDenied(_)));
        assert!(matches!(f.coordinator.state(), CaptureState::Failed { .. }));
        assert!(f.coordinator.selected_image().is_none());
    }

    #[tokio::test]
    async fn test_select_image_from_source() {
        let mut f = fixture(FakeAnalyzer::pasta());
        let source = StaticImageSource::selected(f.photo.clone());

        f.coordinator
            .select_image(&source, PickSource::Library)
            .await
            .unwrap();

        assert_eq!(f.coordinator.state(), &CaptureState::ImageSelected);
        assert_eq!(f.coordinator.selected_image(), Some(&f.photo));
    }

    #[tokio::test]
    async fn test_media_dir_receives_fingerprint_named_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dinner.jpg");
        std::fs::write(&path, b"dinner photo").unwrap();
        let media_dir = dir.path().join("media");

        let transform = FakeTransform::new(dir.path().join("work"), |_| 0);
        let mut coordinator = CaptureCoordinator::new(
            ImageSizeReducer::new(transform),
            Arc::new(FakeAnalyzer::pasta()),
            DietEntryStore::in_memory(),
            CaptureConfig {
                media_dir: Some(media_dir.clone()),
                ..CaptureConfig::default()
            },
        );
        coordinator.choose_image(PickedImage::new(&path, 640, 480));

        let outcome = coordinator.submit(CaptureDraft::new("Dinner")).await.unwrap();
        let entry = outcome.entry();

        let expected = media_dir.join(format!("{}.jpg", entry.fingerprint));
        assert_eq!(entry.image_location, expected);
        assert_eq!(std::fs::read(&expected).unwrap(), b"dinner photo");
    }
}
