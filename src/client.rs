use crate::{
    Transcriber,
    error::{Result, ScribeError},
    model::{MARKDOWN_PROMPT, VisionModel},
    source::ImageSource,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completions endpoint used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.together.xyz/v1";

/// Environment variable consulted for the API key.
pub const API_KEY_ENV: &str = "TOGETHER_API_KEY";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for the hosted vision API.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL, `/chat/completions` is appended to it.
    pub base_url: String,
    /// Upper bound for a single transcription request.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Picks the explicit key when it is non-empty, else the fallback.
pub fn resolve_api_key(explicit: Option<&str>, fallback: Option<&str>) -> Option<String> {
    explicit
        .filter(|key| !key.trim().is_empty())
        .or(fallback.filter(|key| !key.trim().is_empty()))
        .map(|key| key.trim().to_string())
}

/// Builds the single user message carrying the prompt and the image.
pub fn build_request(model: VisionModel, image_url: String) -> ChatRequest {
    ChatRequest {
        model: model.model_id(),
        messages: vec![ChatMessage {
            role: "user",
            content: vec![
                ContentPart::Text {
                    text: MARKDOWN_PROMPT.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: image_url },
                },
            ],
        }],
    }
}

/// Blocking client for a hosted chat-completions vision model.
pub struct VisionClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: VisionModel,
}

impl VisionClient {
    /// Creates a client, failing before any network activity if the key is
    /// missing or empty.
    pub fn new(api_key: Option<&str>, model: VisionModel, config: &ClientConfig) -> Result<Self> {
        let api_key = resolve_api_key(api_key, None).ok_or(ScribeError::MissingApiKey)?;

        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model,
        })
    }

    fn complete(&self, request: &ChatRequest) -> Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|err| err.error.message)
                .unwrap_or(body);
            log::warn!("Vision API answered {status}: {message}");
            return Err(ScribeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ScribeError::EmptyResponse)
    }
}

impl Transcriber for VisionClient {
    type Error = ScribeError;

    fn transcribe(&self, source: &ImageSource) -> Result<String> {
        log::debug!("Sending {source} to {}", self.model.model_id());
        let request = build_request(self.model, source.image_url()?);
        let markdown = self.complete(&request)?;
        log::info!("Transcription completed with {}", self.model);
        Ok(markdown)
    }
}

/// Transcribes the image at `source` (a path or an http(s) URL) to markdown
/// with the default endpoint.
pub fn ocr(source: &str, api_key: Option<&str>, model: VisionModel) -> Result<String> {
    ocr_with_config(source, api_key, model, &ClientConfig::default())
}

/// Same as [`ocr`] against a custom endpoint.
pub fn ocr_with_config(
    source: &str,
    api_key: Option<&str>,
    model: VisionModel,
    config: &ClientConfig,
) -> Result<String> {
    VisionClient::new(api_key, model, config)?.transcribe(&ImageSource::parse(source))
}
