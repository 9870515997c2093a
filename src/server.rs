use crate::{
    Transcriber,
    client::{ClientConfig, VisionClient, resolve_api_key},
    error::{Result, ScribeError},
    model::VisionModel,
    page::{self, LOCAL_ENGINE, Notice},
    source::{ImageSource, decode_data_url, is_data_url, is_remote},
    tesseract::{TesseractConfig, TesseractEngine},
    upload::{extension_for_mime, with_upload},
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    path::PathBuf,
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};

/// Upload size accepted by the form when nothing else is configured.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Engine preselected on the upload page.
pub const DEFAULT_FORM_ENGINE: EngineChoice = EngineChoice::Vision(VisionModel::Llama11B);

const MISSING_KEY_WARNING: &str = "Please enter your API key to proceed.";
const MISSING_IMAGE_WARNING: &str = "Please choose an image file (jpg, jpeg or png).";

/// Everything the HTTP layer needs to run a transcription.
#[derive(Clone, Debug)]
pub struct ScribeConfig {
    pub client: ClientConfig,
    pub tesseract: TesseractConfig,
    /// Credential used when the request does not carry one.
    pub fallback_api_key: Option<String>,
    pub max_upload_bytes: usize,
    /// Directory for uploaded images, the system temp dir if unset.
    pub upload_dir: Option<PathBuf>,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            tesseract: TesseractConfig::default(),
            fallback_api_key: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_dir: None,
        }
    }
}

/// Which backend handles a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineChoice {
    Vision(VisionModel),
    Local,
}

impl Default for EngineChoice {
    fn default() -> Self {
        EngineChoice::Vision(VisionModel::default())
    }
}

impl EngineChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineChoice::Vision(model) => model.as_str(),
            EngineChoice::Local => LOCAL_ENGINE,
        }
    }

    pub fn needs_api_key(&self) -> bool {
        matches!(self, EngineChoice::Vision(_))
    }
}

impl FromStr for EngineChoice {
    type Err = ScribeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == LOCAL_ENGINE {
            Ok(EngineChoice::Local)
        } else {
            s.parse().map(EngineChoice::Vision)
        }
    }
}

/// Builds the backend for a request.
pub fn transcriber_for(
    choice: EngineChoice,
    api_key: Option<&str>,
    config: &ScribeConfig,
) -> Result<Box<dyn Transcriber<Error = ScribeError> + Send>> {
    match choice {
        EngineChoice::Vision(model) => Ok(Box::new(VisionClient::new(api_key, model, &config.client)?)),
        EngineChoice::Local => Ok(Box::new(TesseractEngine::new(config.tesseract.clone()))),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OcrRequest {
    /// An http(s) URL or a base64 `data:` URL of the image.
    pub image: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name, or `local` for tesseract.
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OcrResponse {
    pub model: String,
    pub duration: Duration,
    pub markdown: String,
}

/// Image accepted by the JSON API. Paths on the server host never are.
enum ApiImage {
    Remote(String),
    Inline {
        extension: &'static str,
        bytes: Vec<u8>,
    },
}

impl ApiImage {
    fn parse(value: &str) -> Result<Self> {
        if is_remote(value) {
            Ok(ApiImage::Remote(value.to_string()))
        } else if is_data_url(value) {
            let (mime, bytes) = decode_data_url(value)?;
            Ok(ApiImage::Inline {
                extension: extension_for_mime(&mime)?,
                bytes,
            })
        } else {
            Err(ScribeError::LocalPath)
        }
    }
}

/// Runs blocking work off the async executor.
async fn run_blocking<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job).await?
}

fn status_for(error: &ScribeError) -> StatusCode {
    if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::BAD_GATEWAY
    }
}

fn error_json(error: &ScribeError) -> Response {
    (status_for(error), Json(json!({ "error": error.to_string() }))).into_response()
}

fn page_response(rendered: askama::Result<String>) -> Response {
    match rendered {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            log::error!("Failed to render page: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

fn index_with(notice: Notice, selected: &str) -> Response {
    page_response(page::render_index(Some(&notice), selected))
}

async fn post_ocr(
    State(config): State<Arc<ScribeConfig>>,
    Json(payload): Json<OcrRequest>,
) -> Response {
    let choice = match payload.model.as_deref().map(EngineChoice::from_str).transpose() {
        Ok(choice) => choice.unwrap_or_default(),
        Err(e) => return error_json(&e),
    };
    let image = match ApiImage::parse(&payload.image) {
        Ok(image) => image,
        Err(e) => {
            log::warn!("Rejected OCR request image: {e}");
            return error_json(&e);
        }
    };
    let api_key = resolve_api_key(
        payload.api_key.as_deref(),
        config.fallback_api_key.as_deref(),
    );

    log::debug!("OCR request with {}", choice.as_str());

    let start_time = Instant::now();
    let result = run_blocking({
        let config = config.clone();
        move || {
            let transcriber = transcriber_for(choice, api_key.as_deref(), &config)?;
            match image {
                ApiImage::Remote(url) => transcriber.transcribe(&ImageSource::Remote(url)),
                ApiImage::Inline { extension, bytes } => with_upload(
                    config.upload_dir.as_deref(),
                    &format!("inline.{extension}"),
                    &bytes,
                    |upload| transcriber.transcribe(&upload.source()),
                ),
            }
        }
    })
    .await;

    match result {
        Ok(markdown) => {
            let response = OcrResponse {
                model: choice.as_str().to_string(),
                duration: start_time.elapsed(),
                markdown,
            };
            (StatusCode::OK, Json(json!(response))).into_response()
        }
        Err(e) => {
            log::warn!("OCR request failed: {e}");
            error_json(&e)
        }
    }
}

async fn get_index() -> Response {
    page_response(page::render_index(None, DEFAULT_FORM_ENGINE.as_str()))
}

#[derive(Default)]
struct UploadForm {
    api_key: Option<String>,
    engine: Option<String>,
    image: Option<(String, Vec<u8>)>,
}

async fn read_form(multipart: &mut Multipart) -> std::result::Result<UploadForm, String> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "api_key" => form.api_key = Some(field.text().await.map_err(|e| e.to_string())?),
            "engine" => form.engine = Some(field.text().await.map_err(|e| e.to_string())?),
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| e.to_string())?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    form.image = Some((file_name, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn post_transcribe(
    State(config): State<Arc<ScribeConfig>>,
    mut multipart: Multipart,
) -> Response {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) => {
            log::warn!("Failed to read upload form: {e}");
            let notice = Notice::Error(format!("An error occurred: {e}"));
            return index_with(notice, DEFAULT_FORM_ENGINE.as_str());
        }
    };

    let selected = form
        .engine
        .unwrap_or_else(|| DEFAULT_FORM_ENGINE.as_str().to_string());
    let choice = match selected.parse::<EngineChoice>() {
        Ok(choice) => choice,
        Err(e) => {
            let notice = Notice::Error(format!("An error occurred: {e}"));
            return index_with(notice, DEFAULT_FORM_ENGINE.as_str());
        }
    };

    let api_key = resolve_api_key(form.api_key.as_deref(), config.fallback_api_key.as_deref());
    if choice.needs_api_key() && api_key.is_none() {
        return index_with(Notice::Warning(MISSING_KEY_WARNING.to_string()), &selected);
    }

    let Some((file_name, bytes)) = form.image else {
        return index_with(Notice::Warning(MISSING_IMAGE_WARNING.to_string()), &selected);
    };

    log::debug!("Transcribing upload {file_name} with {}", choice.as_str());

    // the upload only lives for the duration of the job
    let result = run_blocking({
        let config = config.clone();
        let file_name = file_name.clone();
        move || {
            with_upload(config.upload_dir.as_deref(), &file_name, &bytes, |upload| {
                let preview = upload.preview_url()?;
                let markdown = transcriber_for(choice, api_key.as_deref(), &config)
                    .and_then(|transcriber| transcriber.transcribe(&upload.source()));
                Ok((preview, markdown))
            })
        }
    })
    .await;

    match result {
        Ok((preview, Ok(markdown))) => {
            page_response(page::render_result(&preview, &markdown, &selected))
        }
        Ok((preview, Err(e))) => {
            log::error!("Transcription of {file_name} failed: {e}");
            let notice = Notice::Error(format!("An error occurred: {e}"));
            page_response(page::render_failure(&preview, &notice, &selected))
        }
        Err(e) => {
            log::warn!("Could not store upload {file_name}: {e}");
            index_with(Notice::Error(format!("An error occurred: {e}")), &selected)
        }
    }
}

/// Routes of the web UI and the JSON API.
pub fn router(config: ScribeConfig) -> Router {
    let max_upload_bytes = config.max_upload_bytes;
    Router::new()
        .route("/", get(get_index))
        .route("/health", get(|| async { "ok" }))
        .route("/transcribe", post(post_transcribe))
        .route("/api/ocr", post(post_ocr))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(Arc::new(config))
}
