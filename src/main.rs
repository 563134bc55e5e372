use anyhow::{Context, Result};
use clap::Parser;
use postfeed::app::{App, AppEvent, AppSettings};
use postfeed::config::Config;
use postfeed::feed::{build_http_client, FeedSource, HttpFeedSource, SubjectId};
use postfeed::util::validate_base_url;
use postfeed::{session, ui};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Get the config directory path (~/.config/postfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("postfeed"))
}

#[derive(Parser, Debug)]
#[command(name = "postfeed", about = "Terminal client for a social post feed")]
struct Args {
    /// Config file (default: ~/.config/postfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subject whose feed to show
    #[arg(long)]
    subject: Option<String>,

    /// API base URL, e.g. http://localhost:3000/api/
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they stay out of the alternate screen
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let base_url = match &args.base_url {
        Some(url) => validate_base_url(url).context("Invalid --base-url")?,
        None => config.base_url()?,
    };
    let subject = match args.subject.as_deref().map(str::trim) {
        Some(subject) if !subject.is_empty() => SubjectId::new(subject),
        _ => config.subject(),
    };

    let client = build_http_client().context("Failed to create HTTP client")?;
    let source: Arc<dyn FeedSource> = Arc::new(
        HttpFeedSource::new(client, &base_url, config.auth_token())
            .context("Failed to build feed endpoint URL")?,
    );

    // First page before the UI starts, so the feed opens populated
    let seed = match source.fetch_page(&subject, None).await {
        Ok(page) => {
            tracing::info!(subject = %subject, posts = page.posts.len(), "Prefetched first page");
            Some(page)
        }
        Err(e) => {
            tracing::warn!(subject = %subject, error = %e, "Initial page prefetch failed, starting empty");
            None
        }
    };

    let settings = AppSettings::from_config(&config);
    let (mut app, initial) = App::new(
        source,
        session::global(),
        &settings,
        subject,
        seed,
        Instant::now(),
    );

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    ui::run(&mut app, initial, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
