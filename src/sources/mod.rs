//! Source connectors
//!
//! Each connector fetches raw data from one public service and hands back
//! plain Rust values or [`NewItem`](crate::store::NewItem) candidates.
//! Connectors never retry; a failed fetch surfaces as [`Error::Source`].

pub mod images;
pub mod import;
pub mod rate_limit;
pub mod rss;
pub mod wikidata;
pub mod wikipedia;
pub mod youtube;

pub use images::ImageFolder;
pub use rate_limit::RequestLimiter;
pub use rss::{FeedEntry, FeedFetcher};
pub use wikidata::{DeathRecord, WikidataClient};
pub use wikipedia::{ArticleContent, ArticleRef, ArticleViews, WikipediaClient};
pub use youtube::{TrendingVideo, YoutubeClient};

use crate::error::{Error, Result};
use reqwest::{Client, Response};
use std::time::Duration;

/// HTTP client with the given user agent and timeout
pub(crate) fn http_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()?)
}

/// Turn a non-2xx response into a source error
pub(crate) async fn check_status(source_name: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    Err(Error::connector(
        source_name,
        format!("HTTP {}: {}", status.as_u16(), snippet.trim()),
    ))
}
