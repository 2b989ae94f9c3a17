//! Analyzer configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::config::{env_u64, ConfigError};

/// Default Foodvisor analysis endpoint.
pub const DEFAULT_ANALYZER_URL: &str = "https://vision.foodvisor.io/api/1.0/en/analysis/";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Analyzer client configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Foodvisor API key.
    pub api_key: String,
    /// Analysis endpoint URL.
    pub url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl AnalyzerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: DEFAULT_ANALYZER_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `FOODVISOR_API_KEY`
    ///
    /// Optional:
    /// - `DIETLOG_ANALYZER_URL` (default: the Foodvisor v1 English endpoint)
    /// - `DIETLOG_ANALYZER_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("FOODVISOR_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("FOODVISOR_API_KEY".to_string()))?;

        let url =
            env::var("DIETLOG_ANALYZER_URL").unwrap_or_else(|_| DEFAULT_ANALYZER_URL.to_string());

        let timeout_secs = env_u64("DIETLOG_ANALYZER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            api_key,
            url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
