use crate::{
    error::{Result, ScribeError},
    source::{ImageSource, data_url},
};
use std::{io::Write, path::Path};
use tempfile::NamedTempFile;

/// Extensions accepted from the upload form.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Lower-cased extension of an uploaded file name, if it is an accepted one.
pub fn image_extension(file_name: &str) -> Result<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(ScribeError::UnsupportedFormat(file_name.to_string()))
    }
}

/// Extension to use for inline image bytes of the given MIME type.
pub fn extension_for_mime(mime: &str) -> Result<&'static str> {
    match mime {
        "image/png" => Ok("png"),
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        other => Err(ScribeError::UnsupportedFormat(other.to_string())),
    }
}

/// An uploaded image stored in a uniquely named temporary file.
///
/// The file is deleted when the value is dropped, so every request gets its
/// own path and nothing is left behind whatever the transcription outcome.
pub struct TempUpload {
    file: NamedTempFile,
    extension: String,
}

impl TempUpload {
    /// Writes the uploaded bytes to a fresh temporary file in the system
    /// temp dir.
    pub fn persist(file_name: &str, bytes: &[u8]) -> Result<Self> {
        Self::persist_in(None, file_name, bytes)
    }

    /// Writes the uploaded bytes to a fresh temporary file in `dir`, or the
    /// system temp dir when `None`.
    pub fn persist_in(dir: Option<&Path>, file_name: &str, bytes: &[u8]) -> Result<Self> {
        let extension = image_extension(file_name)?;
        let suffix = format!(".{extension}");
        let mut builder = tempfile::Builder::new();
        builder.prefix("scribe-upload-").suffix(&suffix);
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        log::debug!("Stored upload {file_name} at {}", file.path().display());
        Ok(Self { file, extension })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn source(&self) -> ImageSource {
        ImageSource::Local(self.path().to_path_buf())
    }

    /// MIME type matching the uploaded file's extension.
    pub fn mime(&self) -> &'static str {
        match self.extension.as_str() {
            "png" => "image/png",
            _ => "image/jpeg",
        }
    }

    /// Data URL for showing the upload back to the user.
    pub fn preview_url(&self) -> Result<String> {
        let bytes = std::fs::read(self.path())?;
        Ok(data_url(self.mime(), &bytes))
    }
}

/// Persists an upload, runs `f` on it and removes the file afterwards.
pub fn with_upload<T, F>(dir: Option<&Path>, file_name: &str, bytes: &[u8], f: F) -> Result<T>
where
    F: FnOnce(&TempUpload) -> Result<T>,
{
    let upload = TempUpload::persist_in(dir, file_name, bytes)?;
    f(&upload)
}
