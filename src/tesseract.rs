use crate::{
    Transcriber,
    error::{Result, ScribeError},
    source::ImageSource,
};
use kornia_image::{Image, allocator::CpuAllocator};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Command,
};

pub const DEFAULT_BINARY: &str = "tesseract";
pub const DEFAULT_THRESHOLD: u8 = 150;

/// Settings for the local OCR branch.
#[derive(Clone, Debug)]
pub struct TesseractConfig {
    /// Name or path of the tesseract executable.
    pub binary: PathBuf,
    /// Gray values above this become white, the rest black.
    pub threshold: u8,
    /// Directory for the intermediate image, the system temp dir if unset.
    pub work_dir: Option<PathBuf>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            threshold: DEFAULT_THRESHOLD,
            work_dir: None,
        }
    }
}

/// Reads a jpg, jpeg or png file as RGB8.
pub fn read_image_rgb8(path: &Path) -> Result<Image<u8, 3, CpuAllocator>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ScribeError::UnsupportedFormat(path.display().to_string()))?;

    match extension.as_str() {
        "jpg" | "jpeg" => Ok(kornia_io::jpeg::read_image_jpeg_rgb8(path)?),
        "png" => Ok(kornia_io::png::read_image_png_rgb8(path)?),
        _ => Err(ScribeError::UnsupportedFormat(extension)),
    }
}

/// Grayscale + threshold preprocessing ahead of character recognition.
///
/// Gray values strictly above `threshold` become white, the rest black.
pub fn binarize(
    image: &Image<u8, 3, CpuAllocator>,
    threshold: u8,
) -> Result<Image<u8, 1, CpuAllocator>> {
    let mut gray = Image::<u8, 1, CpuAllocator>::from_size_val(image.size(), 0, CpuAllocator)?;
    kornia_imgproc::color::gray_from_rgb_u8(image, &mut gray)?;

    let mut binary = Image::<u8, 1, CpuAllocator>::from_size_val(image.size(), 0, CpuAllocator)?;
    kornia_imgproc::threshold::threshold_binary(&gray, &mut binary, threshold, 255)?;
    Ok(binary)
}

/// Local OCR through the `tesseract` command line tool.
pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    fn recognize(&self, path: &Path) -> Result<String> {
        let image = read_image_rgb8(path)?;
        let binary = binarize(&image, self.config.threshold)?;

        // removed when dropped, on every return path
        let mut builder = tempfile::Builder::new();
        builder.prefix("scribe-ocr-").suffix(".png");
        let scratch = match &self.config.work_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        kornia_io::png::write_image_png_gray8(scratch.path(), &binary)?;

        log::debug!("Running {} on {}", self.config.binary.display(), path.display());

        let output = Command::new(&self.config.binary)
            .arg(scratch.path())
            .arg("stdout")
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ScribeError::Ocr(format!(
                    "{} not found, is tesseract installed?",
                    self.config.binary.display()
                )),
                _ => ScribeError::Ocr(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::error!("tesseract exited with {}: {stderr}", output.status);
            return Err(ScribeError::Ocr(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Transcriber for TesseractEngine {
    type Error = ScribeError;

    fn transcribe(&self, source: &ImageSource) -> Result<String> {
        match source {
            ImageSource::Local(path) => {
                let text = self.recognize(path)?;
                log::info!("Local OCR completed for {}", path.display());
                Ok(text)
            }
            ImageSource::Remote(url) => Err(ScribeError::RemoteSource(url.clone())),
        }
    }
}
