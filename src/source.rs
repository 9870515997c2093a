use crate::error::{Result, ScribeError};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::path::{Path, PathBuf};

/// MIME label used when embedding a local image for the hosted model.
pub const DATA_URL_MIME: &str = "image/jpeg";

/// Returns true if the path is a remote `http://` or `https://` URL.
pub fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Reads the file and returns its bytes as standard base64.
pub fn encode_image(path: impl AsRef<Path>) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(STANDARD.encode(bytes))
}

/// Builds a `data:` URL embedding the given bytes.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Returns true if the string is an inline `data:` URL.
pub fn is_data_url(value: &str) -> bool {
    value.starts_with("data:")
}

/// Splits a base64 `data:` URL into its MIME type and decoded bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let invalid = || ScribeError::InvalidDataUrl(url.chars().take(40).collect());

    let rest = url.strip_prefix("data:").ok_or_else(invalid)?;
    let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let mime = header.strip_suffix(";base64").ok_or_else(invalid)?;
    let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
    Ok((mime.to_ascii_lowercase(), bytes))
}

/// Where the image to transcribe lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// A remote URL handed to the model as is.
    Remote(String),
}

impl ImageSource {
    /// Classifies a user supplied string as a remote URL or a local path.
    pub fn parse(value: &str) -> Self {
        if is_remote(value) {
            ImageSource::Remote(value.to_string())
        } else {
            ImageSource::Local(PathBuf::from(value))
        }
    }

    /// Returns the URL to place in the model request.
    ///
    /// Remote URLs pass through unmodified, local files are inlined as a
    /// base64 data URL.
    pub fn image_url(&self) -> Result<String> {
        match self {
            ImageSource::Remote(url) => Ok(url.clone()),
            ImageSource::Local(path) => Ok(data_url(DATA_URL_MIME, &std::fs::read(path)?)),
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Local(path) => write!(f, "{}", path.display()),
            ImageSource::Remote(url) => f.write_str(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detects_remote_urls() {
        assert!(is_remote("http://example.com/a.png"));
        assert!(is_remote("https://example.com/a.png"));
        assert!(!is_remote("ftp://example.com/a.png"));
        assert!(!is_remote("/tmp/https.png"));
        assert!(!is_remote("image.jpg"));
    }

    #[test]
    fn local_file_becomes_data_url() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"hello")?;

        let source = ImageSource::parse(file.path().to_str().unwrap());
        assert_eq!(source, ImageSource::Local(file.path().to_path_buf()));
        assert_eq!(encode_image(file.path())?, "aGVsbG8=");
        assert_eq!(source.image_url()?, "data:image/jpeg;base64,aGVsbG8=");
        Ok(())
    }

    #[test]
    fn remote_url_passes_through() -> Result<()> {
        let url = "https://example.com/scan.png?size=large";
        let source = ImageSource::parse(url);
        assert_eq!(source, ImageSource::Remote(url.to_string()));
        assert_eq!(source.image_url()?, url);
        Ok(())
    }

    #[test]
    fn missing_local_file_is_an_error() {
        let source = ImageSource::parse("/definitely/not/here.png");
        assert!(source.image_url().is_err());
    }

    #[test]
    fn decodes_data_urls() {
        let (mime, bytes) = decode_data_url("data:image/PNG;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"hello");
        assert!(is_data_url("data:image/png;base64,aGVsbG8="));
        assert!(!is_data_url("/tmp/data:x.png"));
    }

    #[test]
    fn rejects_malformed_data_urls() {
        for url in [
            "data:image/png,aGVsbG8=",
            "data:image/png;base64",
            "data:image/png;base64,***",
            "image/png;base64,aGVsbG8=",
        ] {
            assert!(
                matches!(decode_data_url(url), Err(ScribeError::InvalidDataUrl(_))),
                "{url}"
            );
        }
    }

    #[test]
    fn data_url_uses_given_mime() {
        assert_eq!(data_url("image/png", &[0xff]), "data:image/png;base64,/w==");
    }
}
