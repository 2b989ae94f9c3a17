//! Remote food recognition.
//!
//! This module provides:
//! - `FoodAnalyzer` trait for abstracting the recognition backend
//! - `FoodvisorClient`, the HTTP implementation against the Foodvisor vision API
//! - `normalize`, which turns the raw API payload into an `AnalysisSummary`
//! - `FakeAnalyzer` for tests
//!
//! # Configuration
//!
//! - `FOODVISOR_API_KEY` (required): API key sent as `Authorization: Api-Key <key>`
//! - `DIETLOG_ANALYZER_URL` (optional): analysis endpoint
//! - `DIETLOG_ANALYZER_TIMEOUT_SECS` (optional): request timeout

mod config;
mod fake;
mod foodvisor;
mod normalize;

pub use config::{AnalyzerConfig, DEFAULT_ANALYZER_URL, DEFAULT_TIMEOUT_SECS};
pub use fake::FakeAnalyzer;
pub use foodvisor::FoodvisorClient;
pub use normalize::{
    normalize, normalize_json, rank_nutrients, RawAnalysisResponse, RawFoodCandidate,
    RawFoodInfo, RawItem, GLYCEMIC_INDEX_KEY, TOP_NUTRIENT_COUNT,
};

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::AnalysisSummary;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("No food detected in the image")]
    NoFoodDetected,
}

/// Photo bytes as they are sent to the analysis API.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    /// File name including an extension; the API rejects names without one.
    pub file_name: String,
    pub mime_type: String,
}

impl ImageUpload {
    /// Build an upload for a file on disk, deriving name and type from the path.
    pub fn from_path(path: &Path, bytes: Vec<u8>) -> Self {
        let format = image::ImageFormat::from_path(path).ok();
        let extension = format
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("jpg");
        let mime_type = format
            .map(|f| f.to_mime_type())
            .unwrap_or("image/jpeg")
            .to_string();

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "image".to_string());

        Self {
            bytes,
            file_name: format!("{}.{}", stem, extension),
            mime_type,
        }
    }
}

/// Trait for food recognition backends.
#[async_trait]
pub trait FoodAnalyzer: Send + Sync {
    /// Recognize the foods in a photo and return the normalized summary.
    async fn analyze(&self, upload: &ImageUpload) -> Result<AnalysisSummary, AnalysisError>;
}
