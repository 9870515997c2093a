/// Errors produced while turning an image into markdown.
#[derive(Debug, thiserror::Error)]
pub enum ScribeError {
    /// No credential was supplied for the hosted vision model.
    #[error("API key must be provided")]
    MissingApiKey,

    /// The image is not a jpg, jpeg or png file.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The requested model or engine name is not known.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The local OCR engine only reads files from disk.
    #[error("Local OCR requires a local image file, got {0}")]
    RemoteSource(String),

    /// The JSON API only reads images from URLs or inline data.
    #[error("Local paths are not accepted, send an http(s) URL or a data URL")]
    LocalPath,

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Request to the vision API failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The vision API answered with a non-success status.
    #[error("Vision API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response from the vision API: {0}")]
    Decode(#[from] serde_json::Error),

    /// The vision API answered without any message content.
    #[error("Vision API returned no content")]
    EmptyResponse,

    #[error("Failed to read image: {0}")]
    ImageIo(#[from] kornia_io::error::IoError),

    #[error(transparent)]
    Image(#[from] kornia_image::ImageError),

    #[error("Transcription task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The tesseract process could not be run or exited with an error.
    #[error("OCR engine failed: {0}")]
    Ocr(String),
}

impl ScribeError {
    /// Returns true when the error comes from the caller's input rather than
    /// from the model backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScribeError::MissingApiKey
                | ScribeError::UnsupportedFormat(_)
                | ScribeError::UnknownModel(_)
                | ScribeError::RemoteSource(_)
                | ScribeError::LocalPath
                | ScribeError::InvalidDataUrl(_)
                | ScribeError::Io(_)
                | ScribeError::ImageIo(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;
