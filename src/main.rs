use anyhow::{Context, Result};
use clap::Parser;
use mistree::api::HttpForumApi;
use mistree::config::Config;
use mistree::feed::FeedIdentity;
use mistree::session::{load_tabs, FeedSession, SyncEvent};
use mistree::tabs::TabSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Get the config file path (~/.config/mistree/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("mistree")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "mistree", about = "Browse and vote on forum topic feeds from the terminal")]
struct Args {
    /// Config file (default: ~/.config/mistree/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feed to open: recent, popular or category:<id>
    #[arg(long, value_name = "FEED")]
    feed: Option<FeedIdentity>,

    /// Forum base URL, overrides the config file
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Topics per page, overrides the config file
    #[arg(long, value_name = "N")]
    page_size: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with the topic list.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    config.validate().context("Invalid configuration")?;
    tracing::debug!(config = ?config, "Effective configuration");

    let api = Arc::new(HttpForumApi::from_config(&config).context("Failed to create API client")?);

    let start_feed = match args.feed {
        Some(feed) => feed,
        None => config.default_feed()?,
    };
    let mut tabs = load_tabs(api.as_ref(), config.categories_as_tabs).await;
    tabs = with_start_feed(tabs, &start_feed)?;

    let (event_tx, event_rx) = mpsc::channel::<SyncEvent>(32);
    let mut session = FeedSession::new(Arc::clone(&api), config.page_size, tabs, event_tx);

    println!("Connected to {}", api.base_url());
    mistree::ui::run(&mut session, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}

/// Select the tab showing `feed`, appending one if no tab does.
fn with_start_feed(tabs: TabSet, feed: &FeedIdentity) -> Result<TabSet> {
    let mut tabs = match tabs.position(feed) {
        Some(_) => tabs,
        None => {
            let mut entries: Vec<(String, FeedIdentity)> = tabs
                .tabs()
                .iter()
                .map(|t| (t.title.clone(), t.identity.clone()))
                .collect();
            entries.push((feed.to_string(), feed.clone()));
            TabSet::new(entries)?
        }
    };
    if let Some(index) = tabs.position(feed) {
        tabs.select(index)?;
    }
    Ok(tabs)
}
