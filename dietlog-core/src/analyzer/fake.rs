//! Fake analyzer for testing.
//!
//! Returns a canned summary (or failure) without network access and counts
//! how often it was asked.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AnalysisError, FoodAnalyzer, ImageUpload};
use crate::types::{AnalysisSummary, FoodSummary, Nutrient};

#[derive(Debug)]
enum FakeResult {
    Summary(AnalysisSummary),
    Status(u16),
}

#[derive(Debug)]
pub struct FakeAnalyzer {
    result: FakeResult,
    calls: AtomicUsize,
    uploads: Mutex<Vec<String>>,
}

impl FakeAnalyzer {
    /// Always answer with `summary`.
    pub fn with_summary(summary: AnalysisSummary) -> Self {
        Self {
            result: FakeResult::Summary(summary),
            calls: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Always fail as if the API returned `status`.
    pub fn failing(status: u16) -> Self {
        Self {
            result: FakeResult::Status(status),
            calls: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// A single-item summary for a bowl of pasta.
    pub fn pasta() -> Self {
        Self::with_summary(AnalysisSummary {
            foods: vec![FoodSummary {
                display_name: "Pasta".to_string(),
                confidence: 0.92,
                quantity: Some(180.0),
                glycemic_index: Some(49.0),
                top_nutrients: vec![
                    Nutrient::new("calories_100g", 131.0),
                    Nutrient::new("carbs_100g", 25.0),
                    Nutrient::new("proteins_100g", 5.0),
                ],
            }],
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// File names of every upload received, in order.
    pub fn uploaded_file_names(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl FoodAnalyzer for FakeAnalyzer {
    async fn analyze(&self, upload: &ImageUpload) -> Result<AnalysisSummary, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.uploads.lock().unwrap().push(upload.file_name.clone());

        match &self.result {
            FakeResult::Summary(summary) => Ok(summary.clone()),
            FakeResult::Status(status) => Err(AnalysisError::Status {
                status: *status,
                body: "fake failure".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload() -> ImageUpload {
        ImageUpload {
            bytes: vec![1, 2, 3],
            file_name: "meal.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fake_analyzer_counts_calls() {
        let analyzer = FakeAnalyzer::pasta();
        let summary = analyzer.analyze(&upload()).await.unwrap();

        assert_eq!(summary.primary().unwrap().display_name, "Pasta");
        assert_eq!(analyzer.calls(), 1);
        assert_eq!(analyzer.uploaded_file_names(), vec!["meal.jpg"]);
    }

    #[tokio::test]
    async fn test_fake_analyzer_failure() {
        let analyzer = FakeAnalyzer::failing(500);
        let err = analyzer.analyze(&upload()).await.unwrap_err();

        assert!(matches!(err, AnalysisError::Status { status: 500, .. }));
        assert_eq!(analyzer.calls(), 1);
    }
}
