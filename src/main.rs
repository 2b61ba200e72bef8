use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use feedwatch::config::Config;
use feedwatch::feed::{Feed, FeedEvent};
use feedwatch::util::parse_feed_url;
use feedwatch::Item;

#[derive(Parser, Debug)]
#[command(name = "feedwatch", about = "Watch an RSS/Atom feed and report new items")]
struct Args {
    /// Feed URL to watch
    url: String,

    /// Minutes between refreshes (overrides the config file; 0 = once)
    #[arg(long, value_name = "MINUTES")]
    interval: Option<u64>,

    /// Path to a TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit new items as JSON lines instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("feedwatch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    let interval_minutes = args.interval.unwrap_or(config.refresh_interval_minutes);

    let url = parse_feed_url(&args.url).context("invalid feed URL")?;
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .build()
        .context("failed to build HTTP client")?;
    let feed = Feed::with_client(url, client, config.fetch_options());
    let mut events = feed.subscribe();

    loop {
        feed.refresh();
        match events.recv().await {
            Some(FeedEvent::Updated { result: Ok(summary), .. }) => {
                tracing::info!(
                    total = summary.total,
                    new_items = summary.new_items,
                    "Refresh complete"
                );
                report_unnotified(&feed, args.json)?;
            }
            Some(FeedEvent::Updated { result: Err(e), .. }) => {
                tracing::warn!(error = %e, "Refresh failed");
            }
            None => break,
        }

        if interval_minutes == 0 {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval_minutes * 60)) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Prints every item not yet surfaced to the user, oldest first so the
/// newest ends up nearest the prompt, then marks them notified.
fn report_unnotified(feed: &Feed, json: bool) -> Result<()> {
    let items = feed.items();
    let pending: Vec<&Item> = items.iter().filter(|item| !item.notified).collect();

    for item in pending.iter().rev() {
        if json {
            println!("{}", serde_json::to_string(item)?);
        } else {
            let when = item
                .published
                .map(|p| p.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "undated".to_string());
            let link = item.link.as_deref().unwrap_or("(no link)");
            println!("[{}] {} - {}", when, item.title, link);
            if !item.stripped_content.is_empty() {
                let preview: String = item.stripped_content.chars().take(200).collect();
                println!("    {}", preview);
            }
        }
    }

    for item in pending {
        feed.mark_notified(&item.identity_key());
    }
    Ok(())
}
