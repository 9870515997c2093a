use argh::FromArgs;
use kornia_scribe::{
    VisionModel,
    client::{API_KEY_ENV, resolve_api_key},
    server::OcrRequest,
    source::{data_url, is_remote},
    upload::image_extension,
};

// defaults for the client
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Scribe client for converting images to markdown
struct ClientArgs {
    /// the host to connect to
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// command to execute: "ocr", "direct" or "health"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Ocr(OcrCommand),
    Direct(DirectCommand),
    Health(HealthCommand),
}

#[derive(FromArgs)]
/// Ask a running server to transcribe an image
#[argh(subcommand, name = "ocr")]
struct OcrCommand {
    /// local path or http(s) url of the image, local files are sent inline
    #[argh(option, short = 'i')]
    image: String,

    /// model name, or "local" for tesseract
    #[argh(option, short = 'm')]
    model: Option<String>,

    /// api key, defaults to the TOGETHER_API_KEY environment variable
    #[argh(option, short = 'k')]
    api_key: Option<String>,
}

#[derive(FromArgs)]
/// Call the vision api directly, without a server
#[argh(subcommand, name = "direct")]
struct DirectCommand {
    /// local path or http(s) url of the image
    #[argh(option, short = 'i')]
    image: String,

    /// model name
    #[argh(option, short = 'm', default = "VisionModel::default()")]
    model: VisionModel,

    /// api key, defaults to the TOGETHER_API_KEY environment variable
    #[argh(option, short = 'k')]
    api_key: Option<String>,
}

#[derive(FromArgs)]
/// Check that the server is up
#[argh(subcommand, name = "health")]
struct HealthCommand {}

// remote urls pass through, local files travel as a data url
fn image_for_server(image: String) -> Result<String, Box<dyn std::error::Error>> {
    if is_remote(&image) {
        return Ok(image);
    }
    let mime = match image_extension(&image)?.as_str() {
        "png" => "image/png",
        _ => "image/jpeg",
    };
    Ok(data_url(mime, &std::fs::read(&image)?))
}

fn api_key_or_env(explicit: Option<String>) -> Option<String> {
    let env = std::env::var(API_KEY_ENV).ok();
    resolve_api_key(explicit.as_deref(), env.as_deref())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ClientArgs = argh::from_env();

    let client = reqwest::Client::new();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    match args.command {
        ClientCommands::Ocr(command) => {
            let response = client
                .post(format!("http://{}/api/ocr", addr))
                .json(&OcrRequest {
                    image: image_for_server(command.image)?,
                    api_key: api_key_or_env(command.api_key),
                    model: command.model,
                })
                .send()
                .await?;

            let result = response.json::<serde_json::Value>().await?;
            match result.get("markdown").and_then(|m| m.as_str()) {
                Some(markdown) => println!("{markdown}"),
                None => println!("Result: {}", serde_json::to_string_pretty(&result)?),
            }
        }
        ClientCommands::Direct(command) => {
            let api_key = api_key_or_env(command.api_key);
            let markdown = tokio::task::spawn_blocking(move || {
                kornia_scribe::ocr(&command.image, api_key.as_deref(), command.model)
            })
            .await??;
            println!("{markdown}");
        }
        ClientCommands::Health(_) => {
            let response = client.get(format!("http://{}/health", addr)).send().await?;
            println!("{}: {}", response.status(), response.text().await?);
        }
    }

    Ok(())
}
