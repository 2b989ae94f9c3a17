//! Foodvisor vision API client.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::config::AnalyzerConfig;
use super::normalize::normalize_json;
use super::{AnalysisError, FoodAnalyzer, ImageUpload};
use crate::types::AnalysisSummary;

/// Sends photos to the Foodvisor analysis endpoint.
#[derive(Debug)]
pub struct FoodvisorClient {
    config: AnalyzerConfig,
    client: reqwest::Client,
}

impl FoodvisorClient {
    pub fn new(config: AnalyzerConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl FoodAnalyzer for FoodvisorClient {
    async fn analyze(&self, upload: &ImageUpload) -> Result<AnalysisSummary, AnalysisError> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;
        let form = Form::new().part("image", part);

        tracing::debug!(
            url = %self.url(),
            file_name = %upload.file_name,
            bytes = upload.bytes.len(),
            "calling analysis API"
        );

        let response = self
            .client
            .post(&self.config.url)
            .header("Authorization", format!("Api-Key {}", self.config.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        if status != 200 {
            tracing::warn!(status, "analysis API request failed");
            return Err(AnalysisError::Status { status, body });
        }

        let summary = normalize_json(&body)?;
        tracing::debug!(foods = summary.foods.len(), "analysis API succeeded");
        Ok(summary)
    }
}
