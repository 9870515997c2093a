use argh::FromArgs;
use kornia_scribe::{
    ClientConfig, TesseractConfig,
    client::{API_KEY_ENV, DEFAULT_BASE_URL},
    server::{self, DEFAULT_MAX_UPLOAD_BYTES, ScribeConfig},
    tesseract::{DEFAULT_BINARY, DEFAULT_THRESHOLD},
};
use std::{path::PathBuf, time::Duration};

// defaults for the server
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(FromArgs)]
/// Scribe serves a web page that converts document images to markdown.
struct ScribeArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// base url of the chat-completions api
    #[argh(option, default = "DEFAULT_BASE_URL.to_string()")]
    base_url: String,

    /// request timeout in seconds for the vision api
    #[argh(option, default = "DEFAULT_TIMEOUT_SECS")]
    timeout: u64,

    /// path to the tesseract binary used by the local engine
    #[argh(option, default = "PathBuf::from(DEFAULT_BINARY)")]
    tesseract: PathBuf,

    /// binarization threshold applied before local OCR
    #[argh(option, default = "DEFAULT_THRESHOLD")]
    threshold: u8,

    /// directory for uploaded images, defaults to the system temp dir
    #[argh(option)]
    upload_dir: Option<PathBuf>,

    /// largest accepted upload in bytes
    #[argh(option, default = "DEFAULT_MAX_UPLOAD_BYTES")]
    max_upload_bytes: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ScribeArgs = argh::from_env();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    let fallback_api_key = std::env::var(API_KEY_ENV).ok();
    if fallback_api_key.is_some() {
        log::info!("Using API key from {API_KEY_ENV} when the form leaves it empty");
    }

    let config = ScribeConfig {
        client: ClientConfig {
            base_url: args.base_url,
            timeout: Duration::from_secs(args.timeout),
        },
        tesseract: TesseractConfig {
            binary: args.tesseract,
            threshold: args.threshold,
            work_dir: None,
        },
        fallback_api_key,
        max_upload_bytes: args.max_upload_bytes,
        upload_dir: args.upload_dir,
    };

    let app = server::router(config);

    log::info!("Starting the server");
    log::info!("Listening on: {}", addr);
    log::info!("Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
