//! Diet entry capture.
//!
//! This module provides:
//! - `CaptureCoordinator`, the state machine that turns a picked photo into a
//!   stored (or replayed) `DietEntry`
//! - `ImageSource` for abstracting where photos come from
//! - `CaptureConfig` for the byte budget and media directory
//!
//! # Example
//!
//! ```ignore
//! use dietlog_core::capture::{CaptureCoordinator, CaptureDraft, FileImageSource, PickSource};
//!
//! coordinator.select_image(&FileImageSource::new("lunch.jpg"), PickSource::Library).await?;
//! let outcome = coordinator.submit(CaptureDraft::new("Lunch")).await?;
//! println!("{}", outcome.entry().id);
//! ```

mod config;
mod coordinator;
mod source;
mod state;

pub use config::CaptureConfig;
pub use coordinator::{CaptureCoordinator, CaptureDraft, CaptureOutcome};
pub use source::{
    FileImageSource, ImageSource, PickError, PickOutcome, PickSource, PickedImage,
    StaticImageSource, ALLOWED_FORMATS,
};
pub use state::CaptureState;
