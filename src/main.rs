use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedline::api::{ApiClient, HttpFeedFetcher, HttpInteractionWriter};
use feedline::{
    ArticleId, Config, FeedFetcher, FeedSession, FixtureFetcher, InteractionWriter, MemoryWriter,
    Rating, SessionOptions,
};

type Session = FeedSession<Box<dyn FeedFetcher>, Box<dyn InteractionWriter>>;

/// Get the default config path (~/.config/feedline/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("feedline")
        .join("config.toml"))
}

/// Parse `ID:VALUE`, where VALUE is -1/0/1 or down/neutral/up.
fn parse_rating(arg: &str) -> Result<(ArticleId, Rating), String> {
    let (id, value) = arg
        .rsplit_once(':')
        .ok_or_else(|| format!("expected ID:VALUE, got '{arg}'"))?;
    if id.is_empty() {
        return Err("article id is empty".to_string());
    }
    let rating = match value {
        "up" | "1" | "+1" => Rating::Up,
        "neutral" | "0" => Rating::Neutral,
        "down" | "-1" => Rating::Down,
        other => return Err(format!("unknown rating '{other}'")),
    };
    Ok((ArticleId::from(id), rating))
}

#[derive(Parser, Debug)]
#[command(
    name = "feedline",
    about = "Page through a recommendations feed and sync ratings and bookmarks"
)]
struct Args {
    /// Feed to load
    #[arg(default_value = "recommendations")]
    feed: String,

    /// Config file (defaults to ~/.config/feedline/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Use the built-in demo feed instead of the HTTP API
    #[arg(long)]
    fixture: bool,

    /// Number of older pages to load after the first page
    #[arg(long, default_value_t = 0)]
    pages: usize,

    /// Rate an article, e.g. `--rate 42:up` (repeatable)
    #[arg(long, value_name = "ID:VALUE", value_parser = parse_rating)]
    rate: Vec<(ArticleId, Rating)>,

    /// Toggle the bookmark on an article (repeatable)
    #[arg(long, value_name = "ID")]
    bookmark: Vec<String>,

    /// Print the bookmarks feed instead of the loaded feed
    #[arg(long)]
    show_bookmarks: bool,
}

fn build_session(args: &Args, config: &Config) -> Result<Session> {
    let options = SessionOptions::from(config);

    if args.fixture {
        tracing::info!("Using demo fixture feed");
        return Ok(FeedSession::new(
            Box::new(FixtureFetcher::demo(config.page_size as usize * 3)),
            Box::new(MemoryWriter::new()),
            options,
        ));
    }

    let client = ApiClient::from_config(config).context("Failed to create API client")?;
    tracing::info!(base = %client.base_url(), "Using HTTP API");
    Ok(FeedSession::new(
        Box::new(HttpFeedFetcher::new(client.clone())),
        Box::new(HttpInteractionWriter::new(client)),
        options,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(config = ?config, "Loaded config");

    let mut session = build_session(&args, &config)?;

    session
        .load_newer(&args.feed)
        .await
        .with_context(|| format!("Failed to load feed '{}'", args.feed))?;
    for _ in 0..args.pages {
        let outcome = session
            .load_older(&args.feed)
            .await
            .with_context(|| format!("Failed to load older page of '{}'", args.feed))?;
        if outcome.end_of_data {
            break;
        }
    }

    for (id, rating) in &args.rate {
        let resolution = session
            .rate_and_sync(id, *rating)
            .await
            .with_context(|| format!("Failed to rate article {id}"))?;
        tracing::info!(article_id = %id, %rating, ?resolution, "Rating synced");
    }

    for id in &args.bookmark {
        let id = ArticleId::from(id.as_str());
        let resolution = session
            .toggle_bookmark_and_sync(&id)
            .await
            .with_context(|| format!("Failed to toggle bookmark on article {id}"))?;
        tracing::info!(article_id = %id, ?resolution, "Bookmark synced");
    }

    let shown = if args.show_bookmarks {
        config.bookmarks_feed.as_str()
    } else {
        args.feed.as_str()
    };
    let snapshot = session
        .snapshot(shown)
        .with_context(|| format!("Feed '{shown}' was never loaded"))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize feed")?
    );

    Ok(())
}
