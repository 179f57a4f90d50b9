use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pr_review_bot::config::Config;
use pr_review_bot::github::GitHubClient;
use pr_review_bot::review::OpenAiClient;
use pr_review_bot::webhook::{self, AppState};

/// Webhook service that sends the diffs of freshly opened GitHub Pull
/// Requests to a language model and posts the generated markdown review
/// back as a comment.
#[derive(Parser, Debug)]
#[command(name = "pr-review-bot", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to .pr-review-bot.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port (overrides config file and PORT env var)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = Config::load(cli.config.as_deref())?;

    let github_token = config.github.token.clone().ok_or(
        "GitHub token not set. Provide github.token in the config file or the GITHUB_TOKEN env var",
    )?;
    let openai_key = config.openai.api_key.clone().ok_or(
        "OpenAI API key not set. Provide openai.api_key in the config file or the OPENAI_API_KEY env var",
    )?;

    let github = GitHubClient::new(&config.github, github_token)?;
    let model = OpenAiClient::new(&config.openai, openai_key)?;
    let state = Arc::new(AppState::new(
        github,
        model,
        config.server.webhook_secret.clone(),
    ));

    if state.webhook_secret.is_none() {
        info!("no webhook secret configured, deliveries are accepted unsigned");
    }

    let port = cli.port.unwrap_or_else(|| config.port());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let router = webhook::build_router(state);

    info!(%addr, "listening for webhook deliveries");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
