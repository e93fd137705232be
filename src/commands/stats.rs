//! stats and recent commands

use crate::config::Config;
use crate::error::Result;
use crate::store::{ContentItem, ContentStore, StoreCounts, StoreKind};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Counts for one store file
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub kind: StoreKind,
    pub path: String,
    pub exists: bool,
    pub counts: StoreCounts,
    /// Posted items per category
    pub categories: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentPost {
    pub kind: StoreKind,
    #[serde(flatten)]
    pub item: ContentItem,
}

fn selected_kinds(kind: Option<StoreKind>) -> Vec<StoreKind> {
    match kind {
        Some(kind) => vec![kind],
        None => StoreKind::ALL.to_vec(),
    }
}

/// Stores that were never created are reported empty instead of being created
pub async fn cmd_stats(config: &Config, kind: Option<StoreKind>) -> Result<Vec<StoreStats>> {
    let mut stats = Vec::new();
    for kind in selected_kinds(kind) {
        let path = config.store_path(kind);
        if !path.exists() {
            debug!("{} store not created yet", kind);
            stats.push(StoreStats {
                kind,
                path: path.display().to_string(),
                exists: false,
                counts: StoreCounts::default(),
                categories: BTreeMap::new(),
            });
            continue;
        }

        let store = ContentStore::open(&path).await?;
        let result = async {
            let counts = store.counts(None).await?;
            let categories = store.category_stats(None).await?;
            Ok::<_, crate::error::Error>((counts, categories))
        }
        .await;
        store.close().await;
        let (counts, categories) = result?;

        stats.push(StoreStats {
            kind,
            path: path.display().to_string(),
            exists: true,
            counts,
            categories,
        });
    }
    Ok(stats)
}

/// Items posted in the last `days` days, newest first within each store
pub async fn cmd_recent(
    config: &Config,
    kind: Option<StoreKind>,
    days: u32,
) -> Result<Vec<RecentPost>> {
    let mut posts = Vec::new();
    for kind in selected_kinds(kind) {
        let path = config.store_path(kind);
        if !path.exists() {
            continue;
        }
        let store = ContentStore::open(&path).await?;
        let items = store.recent_posted(None, days).await;
        store.close().await;
        posts.extend(items?.into_iter().map(|item| RecentPost { kind, item }));
    }
    Ok(posts)
}

pub fn print_stats(stats: &[StoreStats]) {
    println!("\n📊 agentparl stores\n");
    for store in stats {
        println!("{} ({})", store.kind, store.path);
        if !store.exists {
            println!("  not created yet\n");
            continue;
        }
        println!(
            "  Items: {} ({} posted, {} waiting)",
            store.counts.total, store.counts.posted, store.counts.unposted
        );
        if !store.categories.is_empty() {
            println!("  Posted by category:");
            for (category, count) in &store.categories {
                println!("    {:<30} {}", category, count);
            }
        }
        println!();
    }
}

pub fn print_recent(posts: &[RecentPost], days: u32) {
    if posts.is_empty() {
        println!("Nothing posted in the last {} days.", days);
        return;
    }
    println!("\nPosted in the last {} days:\n", days);
    for post in posts {
        let when = post
            .item
            .post_date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{}  [{}] {}", when, post.kind, post.item.title);
        if let Some(url) = &post.item.url {
            println!("                  {}", url);
        }
    }
}
