//! Image size reduction for captured photos.
//!
//! Photos coming off a phone camera are routinely larger than the analysis API
//! accepts. `ImageSizeReducer` repeatedly shrinks the width by 20% and
//! re-encodes as JPEG until the file fits the byte budget. The actual pixel
//! work sits behind the `ImageTransform` trait so the loop can be exercised
//! without decoding real photos.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageReader;
use thiserror::Error;
use uuid::Uuid;

/// Default byte budget for an analyzed photo (2MB).
pub const DEFAULT_MAX_BYTES: u64 = 2 * 1024 * 1024;

/// Width multiplier applied on every reduction step.
pub const SHRINK_FACTOR: f64 = 0.8;

/// JPEG quality used when re-encoding (0.7 on a 0..1 scale).
pub const JPEG_QUALITY: u8 = 70;

/// Upper bound on reduction steps before giving up.
pub const MAX_ITERATIONS: usize = 16;

/// Narrowest width the reducer will produce.
pub const MIN_WIDTH: u32 = 32;

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to read image: {0}")]
    Read(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error(
        "Cannot meet size budget of {max_bytes} bytes (still {last_size} bytes at width {last_width})"
    )]
    BudgetUnreachable {
        max_bytes: u64,
        last_size: u64,
        last_width: u32,
    },
}

/// Reference to an encoded image on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl ImageHandle {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }
}

/// Primitive operations the reducer needs from an image backend.
pub trait ImageTransform: Send + Sync {
    /// Size of the file at `path` in bytes, or 0 if it does not exist.
    fn size_of(&self, path: &Path) -> u64;

    /// Scale `source` to `target_width` (keeping aspect ratio) and re-encode
    /// it lossily at `quality`, producing a new artifact.
    fn resize(
        &self,
        source: &ImageHandle,
        target_width: u32,
        quality: u8,
    ) -> Result<ImageHandle, CompressionError>;

    /// Drop an intermediate artifact that is no longer needed.
    fn discard(&self, _image: &ImageHandle) {}
}

/// Result of a reduction run.
#[derive(Debug, Clone)]
pub struct Reduction {
    /// The final image, which is the input itself if it already fit.
    pub image: ImageHandle,
    /// Byte size of `image`.
    pub size: u64,
    /// Width produced by each step, in order.
    pub widths: Vec<u32>,
}

impl Reduction {
    pub fn was_reduced(&self) -> bool {
        !self.widths.is_empty()
    }
}

/// Shrinks images until they fit a byte budget.
pub struct ImageSizeReducer<T> {
    transform: T,
    max_iterations: usize,
    min_width: u32,
}

impl<T: ImageTransform> ImageSizeReducer<T> {
    pub fn new(transform: T) -> Self {
        Self {
            transform,
            max_iterations: MAX_ITERATIONS,
            min_width: MIN_WIDTH,
        }
    }

    /// Override the iteration cap and width floor.
    pub fn with_limits(mut self, max_iterations: usize, min_width: u32) -> Self {
        self.max_iterations = max_iterations;
        self.min_width = min_width.max(1);
        self
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// Reduce `source` until its encoded size is at most `max_bytes`.
    ///
    /// Every step re-encodes the original source at a strictly smaller width,
    /// so quality loss does not compound across steps. Gives up with
    /// `BudgetUnreachable` once the iteration cap or the width floor is hit.
    pub fn reduce(
        &self,
        source: &ImageHandle,
        max_bytes: u64,
    ) -> Result<Reduction, CompressionError> {
        let mut size = self.transform.size_of(&source.path);
        if size <= max_bytes {
            return Ok(Reduction {
                image: source.clone(),
                size,
                widths: Vec::new(),
            });
        }

        let mut width = source.width;
        let mut widths = Vec::new();
        let mut previous: Option<ImageHandle> = None;

        for _ in 0..self.max_iterations {
            let next_width = shrink(width);
            if next_width < self.min_width || next_width >= width {
                break;
            }

            let resized = self.transform.resize(source, next_width, JPEG_QUALITY);
            if let Some(prev) = previous.take() {
                self.transform.discard(&prev);
            }
            let resized = resized?;

            width = next_width;
            widths.push(width);
            size = self.transform.size_of(&resized.path);
            tracing::debug!(width, size, max_bytes, "reduced image");

            if size <= max_bytes {
                return Ok(Reduction {
                    image: resized,
                    size,
                    widths,
                });
            }
            previous = Some(resized);
        }

        if let Some(prev) = previous {
            self.transform.discard(&prev);
        }

        tracing::warn!(width, size, max_bytes, "image did not converge under budget");
        Err(CompressionError::BudgetUnreachable {
            max_bytes,
            last_size: size,
            last_width: width,
        })
    }
}

fn shrink(width: u32) -> u32 {
    (f64::from(width) * SHRINK_FACTOR).round() as u32
}

fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = u64::from(height) * u64::from(target_width) / u64::from(width.max(1));
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

/// `ImageTransform` backed by the `image` crate, writing JPEG artifacts into a
/// work directory.
pub struct JpegTransform {
    work_dir: PathBuf,
}

impl JpegTransform {
    pub fn new(work_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let work_dir = work_dir.into();
        std::fs::create_dir_all(&work_dir)?;
        Ok(Self { work_dir })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

impl ImageTransform for JpegTransform {
    fn size_of(&self, path: &Path) -> u64 {
        std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }

    fn resize(
        &self,
        source: &ImageHandle,
        target_width: u32,
        quality: u8,
    ) -> Result<ImageHandle, CompressionError> {
        let img = ImageReader::open(&source.path)
            .map_err(|e| CompressionError::Read(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| CompressionError::Read(e.to_string()))?
            .decode()
            .map_err(|e| CompressionError::Decode(e.to_string()))?;

        let target_height = scaled_height(img.width(), img.height(), target_width);
        // JPEG has no alpha channel
        let resized = img
            .resize_exact(target_width, target_height, FilterType::Triangle)
            .to_rgb8();

        let path = self
            .work_dir
            .join(format!("{}.jpg", Uuid::new_v4().simple()));
        let file = File::create(&path).map_err(|e| CompressionError::Encode(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        resized
            .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
            .map_err(|e| CompressionError::Encode(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| CompressionError::Encode(e.to_string()))?;

        Ok(ImageHandle {
            path,
            width: target_width,
            height: target_height,
        })
    }

    fn discard(&self, image: &ImageHandle) {
        if image.path.starts_with(&self.work_dir) {
            if let Err(e) = std::fs::remove_file(&image.path) {
                tracing::debug!(path = %image.path.display(), error = %e, "failed to discard artifact");
            }
        }
    }
}

type SizeFn = Box<dyn Fn(u32) -> u64 + Send + Sync>;

/// Deterministic transform for tests.
///
/// The encoded size of a resized image is whatever `size_for_width` says it
/// is. Artifacts are tiny real files whose content depends only on the source
/// path and width, so the same source always yields byte-identical output.
pub struct FakeTransform {
    work_dir: PathBuf,
    size_for_width: SizeFn,
    sizes: Mutex<HashMap<PathBuf, u64>>,
    resize_calls: Mutex<Vec<u32>>,
    fail_with: Option<String>,
}

impl FakeTransform {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        size_for_width: impl Fn(u32) -> u64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            size_for_width: Box::new(size_for_width),
            sizes: Mutex::new(HashMap::new()),
            resize_calls: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    /// A transform whose `resize` always fails to decode.
    pub fn failing(work_dir: impl Into<PathBuf>, message: &str) -> Self {
        let mut transform = Self::new(work_dir, |_| 0);
        transform.fail_with = Some(message.to_string());
        transform
    }

    /// Report `size` bytes for `path` instead of its real length.
    pub fn with_size(self, path: impl Into<PathBuf>, size: u64) -> Self {
        self.sizes.lock().unwrap().insert(path.into(), size);
        self
    }

    /// Target widths passed to `resize`, in call order.
    pub fn resize_calls(&self) -> Vec<u32> {
        self.resize_calls.lock().unwrap().clone()
    }
}

impl ImageTransform for FakeTransform {
    fn size_of(&self, path: &Path) -> u64 {
        if let Some(size) = self.sizes.lock().unwrap().get(path) {
            return *size;
        }
        std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }

    fn resize(
        &self,
        source: &ImageHandle,
        target_width: u32,
        _quality: u8,
    ) -> Result<ImageHandle, CompressionError> {
        self.resize_calls.lock().unwrap().push(target_width);

        if let Some(message) = &self.fail_with {
            return Err(CompressionError::Decode(message.clone()));
        }

        std::fs::create_dir_all(&self.work_dir)
            .map_err(|e| CompressionError::Encode(e.to_string()))?;

        let stem = source
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let path = self.work_dir.join(format!("{}-w{}.jpg", stem, target_width));
        let content = format!("{}@{}", source.path.display(), target_width);
        std::fs::write(&path, content).map_err(|e| CompressionError::Encode(e.to_string()))?;

        self.sizes
            .lock()
            .unwrap()
            .insert(path.clone(), (self.size_for_width)(target_width));

        Ok(ImageHandle {
            path,
            width: target_width,
            height: scaled_height(source.width, source.height, target_width),
        })
    }
}
