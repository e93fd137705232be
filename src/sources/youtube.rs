//! YouTube Data API connector (most popular chart)

use super::{check_status, http_client};
use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

const SOURCE: &str = "youtube";

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    channel_title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    // The API sends counts as strings
    #[serde(default)]
    view_count: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendingVideo {
    pub id: String,
    pub title: String,
    pub channel: Option<String>,
    pub views: Option<u64>,
}

impl TrendingVideo {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

impl From<VideoResource> for TrendingVideo {
    fn from(video: VideoResource) -> Self {
        TrendingVideo {
            views: video
                .statistics
                .and_then(|s| s.view_count)
                .and_then(|v| v.parse().ok()),
            id: video.id,
            title: video.snippet.title,
            channel: video.snippet.channel_title,
        }
    }
}

pub struct YoutubeClient {
    client: Client,
    api_base: String,
    api_key: String,
}

impl YoutubeClient {
    pub fn new(
        api_base: &str,
        api_key: String,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(user_agent, timeout)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.youtube.api_base,
            config.youtube_api_key()?,
            &config.wikipedia.user_agent,
            Duration::from_secs(config.youtube.timeout_secs),
        )
    }

    /// Most popular videos in a region, in chart order
    pub async fn most_popular(&self, region: &str, max_results: u32) -> Result<Vec<TrendingVideo>> {
        let max_results = max_results.clamp(1, 50).to_string();
        let response = self
            .client
            .get(format!("{}/videos", self.api_base))
            .query(&[
                ("part", "snippet,statistics"),
                ("chart", "mostPopular"),
                ("regionCode", region),
                ("maxResults", max_results.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;
        let response = check_status(SOURCE, response).await?;
        let parsed: VideoListResponse = response
            .json()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        let videos: Vec<TrendingVideo> =
            parsed.items.into_iter().map(TrendingVideo::from).collect();
        info!("Fetched {} trending videos for {}", videos.len(), region);
        Ok(videos)
    }
}
