//! Image sources: where picked photos come from.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use image::{ImageFormat, ImageReader};
use thiserror::Error;

use crate::image::ImageHandle;

/// Allowed image formats for meal photos.
pub const ALLOWED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickSource {
    Camera,
    Library,
}

/// A photo the user picked, with its declared pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl PickedImage {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }

    pub fn handle(&self) -> ImageHandle {
        ImageHandle::new(self.path.clone(), self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Selected(PickedImage),
    Canceled,
}

#[derive(Error, Debug)]
pub enum PickError {
    #[error("{0}")]
    PermissionDenied(String),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Something that can hand over a photo: camera, photo library, file system.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn pick(&self, source: PickSource) -> Result<PickOutcome, PickError>;
}

/// Picks an existing file from disk, regardless of requested source.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
}

impl FileImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn pick(&self, _source: PickSource) -> Result<PickOutcome, PickError> {
        let reader = ImageReader::open(&self.path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied => PickError::PermissionDenied(format!(
                    "Cannot read {}",
                    self.path.display()
                )),
                _ => PickError::Io(e),
            })?;

        let format = reader
            .format()
            .ok_or_else(|| PickError::UnsupportedFormat("could not detect format".to_string()))?;

        if !ALLOWED_FORMATS.contains(&format) {
            return Err(PickError::UnsupportedFormat(format!(
                "{:?}. Allowed: JPEG, PNG, WebP",
                format
            )));
        }

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| PickError::UnsupportedFormat(e.to_string()))?;

        Ok(PickOutcome::Selected(PickedImage::new(
            self.path.clone(),
            width,
            height,
        )))
    }
}

/// Source with a fixed answer, for tests.
#[derive(Debug)]
pub struct StaticImageSource {
    outcome: Option<PickedImage>,
    denied: bool,
}

impl StaticImageSource {
    pub fn selected(image: PickedImage) -> Self {
        Self {
            outcome: Some(image),
            denied: false,
        }
    }

    pub fn canceled() -> Self {
        Self {
            outcome: None,
            denied: false,
        }
    }

    pub fn denied() -> Self {
        Self {
            outcome: None,
            denied: true,
        }
    }
}

#[async_trait]
impl ImageSource for StaticImageSource {
    async fn pick(&self, source: PickSource) -> Result<PickOutcome, PickError> {
        if self.denied {
            let what = match source {
                PickSource::Camera => "camera",
                PickSource::Library => "media library",
            };
            return Err(PickError::PermissionDenied(format!(
                "Sorry, we need {} permissions to make this work!",
                what
            )));
        }

        Ok(match &self.outcome {
            Some(image) => PickOutcome::Selected(image.clone()),
            None => PickOutcome::Canceled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[tokio::test]
    async fn test_file_source_reads_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meal.png");
        RgbImage::from_pixel(40, 30, Rgb([200, 100, 50]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let outcome = FileImageSource::new(&path)
            .pick(PickSource::Library)
            .await
            .unwrap();
        assert_eq!(outcome, PickOutcome::Selected(PickedImage::new(&path, 40, 30)));
    }

    #[tokio::test]
    async fn test_file_source_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"just text").unwrap();

        let err = FileImageSource::new(&path)
            .pick(PickSource::Library)
            .await
            .unwrap_err();
        assert!(matches!(err, PickError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let err = FileImageSource::new("/definitely/not/here.jpg")
            .pick(PickSource::Camera)
            .await
            .unwrap_err();
        assert!(matches!(err, PickError::Io(_)));
    }

    #[tokio::test]
    async fn test_static_source_denied_names_the_permission() {
        let err = StaticImageSource::denied()
            .pick(PickSource::Camera)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("camera"));
    }
}
