use log::{error, info};
use std::env;
use std::process::ExitCode;

use recipe_extract::{load_config, ExtractionInput, RecipePipeline};

const USAGE: &str = "Usage: recipe-extract <url> [--html <file>] [--no-ai]";

struct Args {
    url: String,
    html_file: Option<String>,
    no_ai: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut url = None;
    let mut html_file = None;
    let mut no_ai = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--html" => {
                html_file = Some(args.next().ok_or("--html needs a file path")?);
            }
            "--no-ai" => no_ai = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            other if other.starts_with("--") => return Err(format!("Unknown option {other}")),
            other => {
                if url.replace(other.to_string()).is_some() {
                    return Err("Only one URL may be given".to_string());
                }
            }
        }
    }

    Ok(Args {
        url: url.ok_or("Please provide a URL as an argument")?,
        html_file,
        no_ai,
    })
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config()?;
    if args.no_ai {
        config.ai.enabled = false;
    }

    let html = match &args.html_file {
        Some(path) => Some(tokio::fs::read_to_string(path).await?),
        None => None,
    };

    let pipeline = RecipePipeline::from_config(&config)?;
    info!(
        "Extracting {} ({})",
        args.url,
        if pipeline.has_ai() { "AI fallback on" } else { "AI fallback off" }
    );

    let result = pipeline
        .extract(ExtractionInput {
            url: args.url,
            html,
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Extraction failed: {}", e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
