use std::path::PathBuf;

use crate::config::{env_u64, ConfigError, DataDir};
use crate::image::DEFAULT_MAX_BYTES;

/// Capture pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Byte budget the photo must fit before analysis.
    pub max_image_bytes: u64,
    /// Where photos of new entries are copied, named by fingerprint. When
    /// `None` the entry points at the compressed image where it was produced.
    pub media_dir: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_BYTES,
            media_dir: None,
        }
    }
}

impl CaptureConfig {
    /// Settings for a data directory, honoring `DIETLOG_MAX_IMAGE_BYTES`.
    pub fn from_env(data_dir: &DataDir) -> Result<Self, ConfigError> {
        Ok(Self {
            max_image_bytes: env_u64("DIETLOG_MAX_IMAGE_BYTES", DEFAULT_MAX_BYTES)?,
            media_dir: Some(data_dir.media_dir()),
        })
    }
}
