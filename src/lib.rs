//! Turn document images into markdown.
//!
//! An image (a local file or a remote URL) is sent to a hosted
//! vision-language model together with a fixed transcription prompt, and the
//! model's markdown answer is returned. A local `tesseract` branch can be used
//! instead of the hosted model. The [`server`] module exposes both through a
//! small browser UI and a JSON endpoint.

pub mod client;
pub mod error;
pub mod model;
pub mod page;
pub mod server;
pub mod source;
pub mod tesseract;
pub mod upload;

pub use client::{ClientConfig, VisionClient, ocr};
pub use error::{Result, ScribeError};
pub use model::VisionModel;
pub use source::ImageSource;
pub use tesseract::{TesseractConfig, TesseractEngine};

/// Trait for backends that turn an image into markdown text.
///
/// The hosted [`VisionClient`] and the local [`TesseractEngine`] both
/// implement it, so callers pick a backend without depending on which one
/// runs. Implementations block until the transcription is complete.
pub trait Transcriber {
    /// The error type that can be returned during transcription.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Transcribes the image at `source` and returns the text.
    fn transcribe(&self, source: &ImageSource) -> std::result::Result<String, Self::Error>;
}
