//! Wikipedia connector
//!
//! Covers the four things the pipelines read from Wikipedia: weekly
//! page-view rankings (Wikimedia metrics API), category listings and
//! article extracts (Action API), and article images (Commons file API).

use super::{check_status, http_client, RequestLimiter};
use crate::config::WikipediaConfig;
use crate::error::{Error, Result};
use crate::media::ImageData;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use rand::seq::SliceRandom;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, warn};

const SOURCE: &str = "wikipedia";

/// Image types the channel accepts
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Deserialize)]
struct TopResponse {
    #[serde(default)]
    items: Vec<TopItem>,
}

#[derive(Debug, Deserialize)]
struct TopItem {
    #[serde(default)]
    articles: Vec<TopArticle>,
}

#[derive(Debug, Deserialize)]
struct TopArticle {
    article: String,
    #[serde(default)]
    views_ceil: u64,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryBody>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: BTreeMap<String, QueryPage>,
    #[serde(default)]
    categorymembers: Vec<CategoryMember>,
}

#[derive(Debug, Deserialize)]
struct QueryPage {
    #[serde(default)]
    pageid: Option<i64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    fullurl: Option<String>,
    #[serde(default)]
    missing: Option<serde_json::Value>,
    #[serde(default)]
    images: Vec<PageImage>,
}

#[derive(Debug, Deserialize)]
struct PageImage {
    title: String,
}

#[derive(Debug, Deserialize)]
struct CategoryMember {
    title: String,
}

#[derive(Debug, Deserialize)]
struct CommonsFile {
    #[serde(default)]
    original: Option<CommonsOriginal>,
}

#[derive(Debug, Deserialize)]
struct CommonsOriginal {
    url: String,
}

/// Page title with its summed views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleViews {
    pub title: String,
    pub views: u64,
}

/// An article that passed the length check during discovery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRef {
    pub title: String,
    pub url: String,
    pub page_id: Option<i64>,
    pub extract: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleContent {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub content: String,
}

/// Sum views per page across days, drop excluded pages, keep the top `top_n`.
///
/// Ties are broken by title so the ranking is stable.
pub fn aggregate_views(
    days: &[Vec<ArticleViews>],
    exclude: &[String],
    top_n: usize,
) -> Vec<ArticleViews> {
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for day in days {
        for article in day {
            if exclude.iter().any(|e| e == &article.title) {
                continue;
            }
            *totals.entry(article.title.as_str()).or_insert(0) += article.views;
        }
    }

    let mut ranked: Vec<ArticleViews> = totals
        .into_iter()
        .map(|(title, views)| ArticleViews {
            title: title.to_string(),
            views,
        })
        .collect();
    ranked.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.title.cmp(&b.title)));
    ranked.truncate(top_n);
    ranked
}

/// Whether a category member is a real article worth posting about
fn is_article_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    !(lower.contains("disambiguation")
        || title.starts_with("List of")
        || title.starts_with("Lists of")
        || title.starts_with("Category:"))
}

fn has_image_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// `File:Some image.jpg` (in any language) -> `Some_image.jpg`
fn commons_file_name(image_title: &str) -> String {
    image_title
        .rsplit(':')
        .next()
        .unwrap_or(image_title)
        .trim()
        .replace(' ', "_")
}

/// Wikipedia and Wikimedia REST client
pub struct WikipediaClient {
    client: Client,
    api_url_template: String,
    metrics_base: String,
    commons_file_base: String,
    image_languages: Vec<String>,
    limiter: RequestLimiter,
}

impl WikipediaClient {
    pub fn new(config: &WikipediaConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(&config.user_agent, Duration::from_secs(config.timeout_secs))?,
            api_url_template: config.api_url_template.clone(),
            metrics_base: config.metrics_base.trim_end_matches('/').to_string(),
            commons_file_base: config.commons_file_base.trim_end_matches('/').to_string(),
            image_languages: config.image_languages.clone(),
            limiter: RequestLimiter::new(config.requests_per_second),
        })
    }

    /// Share a limiter with other Wikimedia clients
    pub fn with_limiter(mut self, limiter: RequestLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    fn api_url(&self, lang: &str) -> String {
        self.api_url_template.replace("{lang}", lang)
    }

    fn page_url(&self, lang: &str, title: &str) -> String {
        let api = self.api_url(lang);
        let site = api.trim_end_matches("/w/api.php");
        format!("{}/wiki/{}", site, title.replace(' ', "_"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        self.limiter.wait().await;
        let response = self.client.get(url).query(query).send().await?;
        let response = check_status(SOURCE, response).await?;
        Ok(response.json().await?)
    }

    /// Most viewed pages in a country on one day
    pub async fn top_articles_on(
        &self,
        country: &str,
        date: NaiveDate,
    ) -> Result<Vec<ArticleViews>> {
        let url = format!(
            "{}/pageviews/top-per-country/{}/all-access/{}",
            self.metrics_base,
            country,
            date.format("%Y/%m/%d")
        );
        self.limiter.wait().await;
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No page-view data for {} on {}", country, date);
            return Ok(Vec::new());
        }
        let response = check_status(SOURCE, response).await?;
        let parsed: TopResponse = response.json().await?;

        Ok(parsed
            .items
            .into_iter()
            .next()
            .map(|item| {
                item.articles
                    .into_iter()
                    .map(|a| ArticleViews {
                        title: a.article,
                        views: a.views_ceil,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Top pages in a country over the `days` days before today
    pub async fn top_articles_over_days(
        &self,
        country: &str,
        days: u32,
        exclude: &[String],
        top_n: usize,
    ) -> Result<Vec<ArticleViews>> {
        let today = Utc::now().date_naive();
        let mut per_day = Vec::new();

        for offset in (1..=days).rev() {
            let date = today - ChronoDuration::days(i64::from(offset));
            let articles = self.top_articles_on(country, date).await?;
            if articles.is_empty() {
                warn!("No page-view data for {} on {}, skipping day", country, date);
                continue;
            }
            per_day.push(articles);
        }

        if per_day.is_empty() {
            return Err(Error::connector(
                SOURCE,
                format!("no page-view data for {} in the last {} days", country, days),
            ));
        }

        let ranked = aggregate_views(&per_day, exclude, top_n);
        info!(
            "Ranked {} pages for {} over {} days",
            ranked.len(),
            country,
            per_day.len()
        );
        Ok(ranked)
    }

    /// Article titles in a category, without lists and disambiguation pages
    pub async fn category_members(
        &self,
        category: &str,
        lang: &str,
        limit: u32,
    ) -> Result<Vec<String>> {
        let cmtitle = format!("Category:{}", category);
        let cmlimit = limit.to_string();
        let response: QueryResponse = self
            .get_json(
                &self.api_url(lang),
                &[
                    ("action", "query"),
                    ("format", "json"),
                    ("list", "categorymembers"),
                    ("cmtitle", &cmtitle),
                    ("cmlimit", &cmlimit),
                    ("cmnamespace", "0"),
                ],
            )
            .await?;

        let members: Vec<String> = response
            .query
            .unwrap_or_default()
            .categorymembers
            .into_iter()
            .map(|m| m.title)
            .filter(|t| is_article_title(t))
            .collect();
        debug!("Category {} has {} usable articles", category, members.len());
        Ok(members)
    }

    async fn first_page(
        &self,
        lang: &str,
        title: &str,
        intro_only: bool,
    ) -> Result<Option<QueryPage>> {
        let mut query = vec![
            ("action", "query"),
            ("format", "json"),
            ("titles", title),
            ("prop", "extracts|info"),
            ("explaintext", "1"),
            ("inprop", "url"),
            ("redirects", "1"),
        ];
        if intro_only {
            query.push(("exintro", "1"));
        }
        let response: QueryResponse = self.get_json(&self.api_url(lang), &query).await?;
        let page = response
            .query
            .unwrap_or_default()
            .pages
            .into_values()
            .next()
            .filter(|p| p.missing.is_none() && !p.title.is_empty());
        Ok(page)
    }

    /// Intro extract and canonical URL of an article
    pub async fn article_intro(&self, title: &str, lang: &str) -> Result<Option<ArticleRef>> {
        let Some(page) = self.first_page(lang, title, true).await? else {
            return Ok(None);
        };
        let url = page
            .fullurl
            .clone()
            .unwrap_or_else(|| self.page_url(lang, &page.title));
        Ok(Some(ArticleRef {
            title: page.title,
            url,
            page_id: page.pageid,
            extract: page.extract.unwrap_or_default(),
        }))
    }

    /// Pick a random article from a category whose intro has at least
    /// `min_chars` characters, trying at most `attempts` members.
    pub async fn random_article_from_category(
        &self,
        category: &str,
        lang: &str,
        min_chars: usize,
        attempts: u32,
    ) -> Result<Option<ArticleRef>> {
        let mut members = self.category_members(category, lang, 100).await?;
        if members.is_empty() {
            warn!("No articles found in category {}", category);
            return Ok(None);
        }
        members.shuffle(&mut rand::thread_rng());

        for title in members.iter().take(attempts as usize) {
            match self.article_intro(title, lang).await {
                Ok(Some(article)) if article.extract.chars().count() >= min_chars => {
                    info!("Found article '{}' in category {}", article.title, category);
                    return Ok(Some(article));
                }
                Ok(Some(article)) => {
                    debug!(
                        "Skipping '{}': intro has {} characters",
                        article.title,
                        article.extract.chars().count()
                    );
                }
                Ok(None) => debug!("Article '{}' not found", title),
                Err(e) => warn!("Failed to fetch article '{}': {}", title, e),
            }
        }

        warn!(
            "No article of at least {} characters in category {} after {} attempts",
            min_chars, category, attempts
        );
        Ok(None)
    }

    /// Intro plus full plain-text body of an article
    pub async fn article_content(&self, title: &str, lang: &str) -> Result<Option<ArticleContent>> {
        let Some(intro) = self.article_intro(title, lang).await? else {
            return Ok(None);
        };
        let Some(full) = self.first_page(lang, title, false).await? else {
            return Ok(None);
        };
        Ok(Some(ArticleContent {
            title: intro.title,
            url: intro.url,
            summary: intro.extract,
            content: full.extract.unwrap_or_default(),
        }))
    }

    async fn image_from_edition(&self, title: &str, lang: &str) -> Result<Option<ImageData>> {
        let response: QueryResponse = self
            .get_json(
                &self.api_url(lang),
                &[
                    ("action", "query"),
                    ("format", "json"),
                    ("titles", title),
                    ("prop", "images"),
                    ("imlimit", "max"),
                ],
            )
            .await?;

        let candidates: Vec<String> = response
            .query
            .unwrap_or_default()
            .pages
            .into_values()
            .flat_map(|p| p.images)
            .map(|i| i.title)
            .filter(|t| has_image_extension(t))
            .collect();
        let Some(chosen) = candidates.choose(&mut rand::thread_rng()).cloned() else {
            debug!("No usable image for '{}' on {}.wikipedia", title, lang);
            return Ok(None);
        };

        let file_name = commons_file_name(&chosen);
        let file: CommonsFile = self
            .get_json(&format!("{}/File:{}", self.commons_file_base, file_name), &[])
            .await?;
        let Some(original) = file.original else {
            return Ok(None);
        };

        self.limiter.wait().await;
        let response = self.client.get(&original.url).send().await?;
        let response = check_status(SOURCE, response).await?;
        let bytes = response.bytes().await?.to_vec();
        let mime = mime_guess::from_path(&file_name)
            .first_raw()
            .unwrap_or("image/jpeg")
            .to_string();

        info!("Fetched image {} ({} bytes) for '{}'", file_name, bytes.len(), title);
        Ok(Some(ImageData::new(bytes, mime, file_name)))
    }

    /// A random JPEG or PNG from the article, trying each configured edition
    pub async fn random_article_image(&self, title: &str) -> Result<Option<ImageData>> {
        for lang in &self.image_languages {
            match self.image_from_edition(title, lang).await {
                Ok(Some(image)) => return Ok(Some(image)),
                Ok(None) => continue,
                Err(e) => warn!("Image lookup for '{}' on {} failed: {}", title, lang, e),
            }
        }
        Ok(None)
    }
}
