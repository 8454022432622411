use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use postwright::config::{ModelSettings, DEFAULT_API_BASE, DEFAULT_MODEL};
use postwright::pipeline::{DraftMode, ErrorPolicy, Pipeline};
use postwright::util::medium_feed_url;

#[derive(Parser, Debug)]
#[command(
    name = "postwright",
    about = "Scrape a Medium article and generate draft LinkedIn posts"
)]
struct Args {
    /// The title of the article to turn into a post
    article_title: String,

    /// The Medium username of the author
    username: String,

    /// Read this feed instead of https://medium.com/feed/@USERNAME
    #[arg(long, value_name = "URL")]
    feed_url: Option<String>,

    /// System prompt file (defaults to $YML_CONFIG or ./config/system_prompts.yml)
    #[arg(long, value_name = "FILE")]
    prompts: Option<PathBuf>,

    /// Chat model identifier
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the OpenAI-compatible chat service
    #[arg(long, value_name = "URL", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Request the three drafts at the same time
    #[arg(long)]
    concurrent_drafts: bool,

    /// What to do when the run fails
    #[arg(long, value_enum, default_value_t = ErrorPolicy::Log)]
    on_error: ErrorPolicy,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the post text.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let feed_url = match args.feed_url {
        Some(url) => url,
        None => medium_feed_url(&args.username)
            .with_context(|| format!("Cannot build a feed URL for user {:?}", args.username))?
            .to_string(),
    };

    let mut settings = ModelSettings::from_env();
    settings.model = args.model;
    settings.api_base = args.api_base;
    if let Some(prompts) = args.prompts {
        settings.prompts_path = prompts;
    }
    tracing::debug!(?settings, "Model settings");

    let http = postwright::http::build_client().context("Failed to build HTTP client")?;
    let draft_mode = if args.concurrent_drafts {
        DraftMode::Concurrent
    } else {
        DraftMode::Sequential
    };
    let pipeline = Pipeline::new(http, settings).with_draft_mode(draft_mode);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = pipeline.run(&feed_url, &args.article_title, &mut out).await;

    args.on_error.settle(result)?;
    Ok(())
}
