use std::path::PathBuf;

use thiserror::Error;

use crate::analyzer::AnalysisError;
use crate::capture::PickError;
use crate::image::CompressionError;

/// Local input problems that block a capture before any work starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill the title before submitting")]
    MissingTitle,

    #[error("Please select an image to analyze")]
    MissingImage,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read store at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write store at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid store contents: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Everything that can stop a capture flow.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to compress image: {0}")]
    Compression(#[from] CompressionError),

    #[error("Failed to analyze the image: {0}")]
    AnalysisFailed(#[from] AnalysisError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Failed to pick image: {0}")]
    ImageSource(String),

    #[error("Failed to save entry: {0}")]
    Storage(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PickError> for CaptureError {
    fn from(err: PickError) -> Self {
        match err {
            PickError::PermissionDenied(what) => CaptureError::PermissionDenied(what),
            other => CaptureError::ImageSource(other.to_string()),
        }
    }
}

impl CaptureError {
    /// Validation failures leave the flow where it was; everything else is terminal.
    pub fn is_validation(&self) -> bool {
        matches!(self, CaptureError::Validation(_))
    }
}
