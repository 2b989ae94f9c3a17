pub mod analyzer;
pub mod capture;
pub mod config;
pub mod error;
pub mod favorites;
pub mod fingerprint;
pub mod image;
pub mod receipts;
pub mod store;
pub mod types;

pub use analyzer::{
    normalize, normalize_json, AnalysisError, AnalyzerConfig, FakeAnalyzer, FoodAnalyzer,
    FoodvisorClient, ImageUpload,
};
pub use capture::{
    CaptureConfig, CaptureCoordinator, CaptureDraft, CaptureOutcome, CaptureState,
    FileImageSource, ImageSource, PickOutcome, PickSource, PickedImage,
};
pub use config::{ConfigError, DataDir};
pub use error::{CaptureError, StoreError, ValidationError};
pub use fingerprint::{fingerprint, fingerprint_file, Fingerprint};
pub use crate::image::{
    CompressionError, FakeTransform, ImageHandle, ImageSizeReducer, ImageTransform,
    JpegTransform, Reduction, DEFAULT_MAX_BYTES,
};
pub use store::DietEntryStore;
pub use types::{AnalysisSummary, DietEntry, FoodSummary, Nutrient};
