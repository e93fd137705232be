//! RSS/Atom connector for the news store

use super::{check_status, http_client};
use crate::config::FeedsConfig;
use crate::error::Result;
use crate::store::{ContentType, NewItem};
use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

/// Source module recorded on collected news
pub const FEED_SOURCE_MODULE: &str = "feed_store";

/// Summaries are cut to this many characters before storage
const SUMMARY_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    /// Feed URL the entry came from
    pub source: String,
}

impl FeedEntry {
    pub fn into_new_item(self, category: &str) -> NewItem {
        let mut item = NewItem::new(self.title, ContentType::News, FEED_SOURCE_MODULE)
            .with_category(category)
            .with_metadata(json!({
                "source": self.source,
                "published": self.published.map(|p| p.to_rfc3339()),
                "summary": self.summary,
            }));
        if let Some(link) = self.link {
            item = item.with_url(link);
        }
        item
    }
}

fn entry_link(entry: &Entry) -> Option<String> {
    let usable = entry.links.iter().filter(|l| !l.href.trim().is_empty());
    for link in usable.clone() {
        let rel = link.rel.as_deref().unwrap_or("");
        if rel.is_empty() || rel.eq_ignore_ascii_case("alternate") {
            return Some(link.href.trim().to_string());
        }
    }
    if let Some(link) = usable.into_iter().next() {
        return Some(link.href.trim().to_string());
    }
    let id = entry.id.trim();
    (id.starts_with("http://") || id.starts_with("https://")).then(|| id.to_string())
}

fn plain_summary(html: &str) -> Option<String> {
    let text = html2text::from_read(html.as_bytes(), 80).unwrap_or_else(|_| html.to_string());
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(SUMMARY_MAX_CHARS).collect())
}

/// Parse a feed document. Entries without a title are dropped.
pub fn parse_feed(bytes: &[u8], source: &str) -> Result<Vec<FeedEntry>> {
    let feed = parser::parse(Cursor::new(bytes))?;
    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry
                .title
                .as_ref()
                .map(|t| t.content.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|t| !t.is_empty())?;
            Some(FeedEntry {
                link: entry_link(&entry),
                summary: entry
                    .summary
                    .as_ref()
                    .and_then(|s| plain_summary(&s.content)),
                published: entry.published.or(entry.updated),
                source: source.to_string(),
                title,
            })
        })
        .collect();
    Ok(entries)
}

/// Downloads and parses configured feeds
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(config: &FeedsConfig, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: http_client(user_agent, Duration::from_secs(config.timeout_secs))?,
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>> {
        let response = self.client.get(url).send().await?;
        let response = check_status("feed", response).await?;
        let bytes = response.bytes().await?;
        let entries = parse_feed(&bytes, url)?;
        debug!("Parsed {} entries from {}", entries.len(), url);
        Ok(entries)
    }
}
