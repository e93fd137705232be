//! feed-store command: collect configured RSS/Atom feeds into the news store

use crate::config::Config;
use crate::error::Result;
use crate::logging::add_progress_bar;
use crate::sources::FeedFetcher;
use crate::store::{ContentStore, InsertOutcome, ItemStore, StoreKind};
use indicatif::ProgressStyle;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedStoreStats {
    pub feeds: usize,
    pub feeds_failed: usize,
    pub entries: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub errors: usize,
}

pub async fn cmd_feed_store(config: &Config) -> Result<FeedStoreStats> {
    let fetcher = FeedFetcher::new(&config.feeds, &config.wikipedia.user_agent)?;
    let store = ContentStore::open_kind(config, StoreKind::News).await?;
    let result = collect(config, &fetcher, &store).await;
    store.close().await;
    result
}

async fn collect(
    config: &Config,
    fetcher: &FeedFetcher,
    store: &dyn ItemStore,
) -> Result<FeedStoreStats> {
    let urls = &config.feeds.urls;
    let mut stats = FeedStoreStats {
        feeds: urls.len(),
        ..Default::default()
    };

    let pb = add_progress_bar(urls.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{bar:30} {pos}/{len} feeds {msg}") {
        pb.set_style(style);
    }

    for url in urls {
        pb.set_message(url.clone());
        let entries = match fetcher.fetch(url).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping feed {}: {}", url, e);
                stats.feeds_failed += 1;
                pb.inc(1);
                continue;
            }
        };

        for entry in entries {
            stats.entries += 1;
            match store.insert(&entry.into_new_item(&config.feeds.category)).await {
                Ok(InsertOutcome::Inserted(_)) => stats.inserted += 1,
                Ok(InsertOutcome::Duplicate) => stats.duplicates += 1,
                Err(e) => {
                    warn!("Could not store entry from {}: {}", url, e);
                    stats.errors += 1;
                }
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Collected {} entries from {} feeds: {} new, {} already known",
        stats.entries,
        stats.feeds - stats.feeds_failed,
        stats.inserted,
        stats.duplicates
    );
    Ok(stats)
}

pub fn print_feed_store_stats(stats: &FeedStoreStats) {
    println!("\n✓ Feed collection complete");
    println!("  Feeds: {} ({} failed)", stats.feeds, stats.feeds_failed);
    println!("  Entries seen: {}", stats.entries);
    println!("  New items: {}", stats.inserted);
    println!("  Already stored: {}", stats.duplicates);
    if stats.errors > 0 {
        println!("  Storage errors: {}", stats.errors);
    }
}
