//! Content store using SQLite
//!
//! Every pipeline domain (quotes, articles, news, images) gets its own
//! database file with the same `content_items` table. A row starts
//! unposted, flips to posted exactly once after a confirmed publish, and
//! is never updated or deleted afterwards; the schema enforces this with
//! a CHECK constraint and two triggers.

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Kind of candidate content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Quote,
    Article,
    News,
    Image,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Quote => write!(f, "quote"),
            ContentType::Article => write!(f, "article"),
            ContentType::News => write!(f, "news"),
            ContentType::Image => write!(f, "image"),
        }
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "quote" => Ok(ContentType::Quote),
            "article" => Ok(ContentType::Article),
            "news" => Ok(ContentType::News),
            "image" => Ok(ContentType::Image),
            _ => Err(Error::Config(format!("Unknown content type: {}", s))),
        }
    }
}

/// Which database file a store lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Quotes,
    Articles,
    News,
    Images,
}

impl StoreKind {
    pub const ALL: [StoreKind; 4] = [
        StoreKind::Quotes,
        StoreKind::Articles,
        StoreKind::News,
        StoreKind::Images,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            StoreKind::Quotes => "quotes.db",
            StoreKind::Articles => "articles.db",
            StoreKind::News => "news.db",
            StoreKind::Images => "images.db",
        }
    }

    /// Content type normally held by this store
    pub fn content_type(&self) -> ContentType {
        match self {
            StoreKind::Quotes => ContentType::Quote,
            StoreKind::Articles => ContentType::Article,
            StoreKind::News => ContentType::News,
            StoreKind::Images => ContentType::Image,
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Quotes => write!(f, "quotes"),
            StoreKind::Articles => write!(f, "articles"),
            StoreKind::News => write!(f, "news"),
            StoreKind::Images => write!(f, "images"),
        }
    }
}

/// A candidate produced by a source connector, not yet stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub url: Option<String>,
    pub content_type: ContentType,
    pub category: Option<String>,
    pub source_module: String,
    pub metadata: serde_json::Value,
}

impl NewItem {
    pub fn new(
        title: impl Into<String>,
        content_type: ContentType,
        source_module: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: None,
            content_type,
            category: None,
            source_module: source_module.into(),
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A stored candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub title: String,
    pub url: Option<String>,
    pub content_type: ContentType,
    pub category: Option<String>,
    pub source_module: String,
    pub posted: bool,
    pub post_date: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    /// String field from the metadata object
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: i64,
    title: String,
    url: Option<String>,
    content_type: String,
    category: Option<String>,
    source_module: String,
    posted: bool,
    post_date: Option<String>,
    metadata: String,
    created_at: String,
}

impl TryFrom<ItemRow> for ContentItem {
    type Error = Error;

    fn try_from(row: ItemRow) -> Result<Self> {
        Ok(ContentItem {
            id: row.id,
            title: row.title,
            url: row.url,
            content_type: row.content_type.parse()?,
            category: row.category,
            source_module: row.source_module,
            posted: row.posted,
            post_date: row.post_date.as_deref().map(parse_timestamp).transpose()?,
            metadata: serde_json::from_str(&row.metadata)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

/// Result of an insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// The natural key already exists; the stored row is untouched
    Duplicate,
}

/// Category restriction for selection.
///
/// Filtering is inclusive: a row matches when its category contains any of
/// the listed strings, compared case-insensitively. Rows without a category
/// never match a non-empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    Any,
    AnyOf(Vec<String>),
}

impl CategoryFilter {
    pub fn any_of<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<String> = categories
            .into_iter()
            .map(Into::into)
            .filter(|c: &String| !c.trim().is_empty())
            .collect();
        if list.is_empty() {
            CategoryFilter::Any
        } else {
            CategoryFilter::AnyOf(list)
        }
    }

    fn patterns(&self) -> Vec<String> {
        match self {
            CategoryFilter::Any => Vec::new(),
            CategoryFilter::AnyOf(list) => list
                .iter()
                .filter(|c| !c.trim().is_empty())
                .map(|c| format!("%{}%", escape_like(c.trim())))
                .collect(),
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Row counts for one store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub total: u64,
    pub posted: u64,
    pub unposted: u64,
}

/// Fixed-width UTC timestamp, so text comparison is chronological
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("Invalid timestamp '{}': {}", value, e)))
}

/// Operations the orchestrator and pipelines need from a store
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert a candidate; a duplicate natural key is not an error
    async fn insert(&self, item: &NewItem) -> Result<InsertOutcome>;

    /// Look up a row by its natural key
    async fn find(
        &self,
        title: &str,
        content_type: ContentType,
        source_module: &str,
    ) -> Result<Option<ContentItem>>;

    /// One uniformly random unposted row; storage errors read as "nothing to do"
    async fn select_random_unposted(
        &self,
        content_type: Option<ContentType>,
        filter: &CategoryFilter,
    ) -> Option<ContentItem>;

    /// Up to `limit` random unposted rows; storage errors read as an empty batch
    async fn select_unposted_batch(
        &self,
        content_type: Option<ContentType>,
        filter: &CategoryFilter,
        limit: u32,
    ) -> Vec<ContentItem>;

    /// Flip an unposted row to posted. `Ok(false)` if the row is missing or
    /// was already posted.
    async fn mark_posted(&self, id: i64) -> Result<bool>;
}

/// SQLite-backed content store
#[derive(Clone)]
pub struct ContentStore {
    pool: SqlitePool,
}

impl ContentStore {
    /// Open (creating if needed) the store at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Opening content store at {:?}", path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open the store file configured for `kind`
    pub async fn open_kind(config: &Config, kind: StoreKind) -> Result<Self> {
        Self::open(&config.store_path(kind)).await
    }

    /// Apply the schema; safe to run on an existing database
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn get(&self, id: i64) -> Result<Option<ContentItem>> {
        let row = sqlx::query_as::<_, ItemRow>("SELECT * FROM content_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ContentItem::try_from).transpose()
    }

    /// Posted rows with `post_date` within the last `since_days` days, newest first
    pub async fn recent_posted(
        &self,
        content_type: Option<ContentType>,
        since_days: u32,
    ) -> Result<Vec<ContentItem>> {
        let since = format_timestamp(Utc::now() - Duration::days(i64::from(since_days)));
        let mut sql =
            String::from("SELECT * FROM content_items WHERE posted = 1 AND post_date >= ?");
        if content_type.is_some() {
            sql.push_str(" AND content_type = ?");
        }
        sql.push_str(" ORDER BY post_date DESC, id DESC");

        let mut query = sqlx::query_as::<_, ItemRow>(&sql).bind(since);
        if let Some(ct) = content_type {
            query = query.bind(ct.to_string());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(ContentItem::try_from).collect()
    }

    /// Number of posted items per category
    pub async fn category_stats(
        &self,
        content_type: Option<ContentType>,
    ) -> Result<BTreeMap<String, u64>> {
        let mut sql = String::from(
            "SELECT category, COUNT(*) FROM content_items WHERE posted = 1 AND category IS NOT NULL",
        );
        if content_type.is_some() {
            sql.push_str(" AND content_type = ?");
        }
        sql.push_str(" GROUP BY category");

        let mut query = sqlx::query_as::<_, (String, i64)>(&sql);
        if let Some(ct) = content_type {
            query = query.bind(ct.to_string());
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(category, count)| (category, count.max(0) as u64))
            .collect())
    }

    pub async fn counts(&self, content_type: Option<ContentType>) -> Result<StoreCounts> {
        let mut sql = String::from(
            "SELECT COUNT(*), COALESCE(SUM(posted), 0) FROM content_items WHERE 1 = 1",
        );
        if content_type.is_some() {
            sql.push_str(" AND content_type = ?");
        }

        let mut query = sqlx::query_as::<_, (i64, i64)>(&sql);
        if let Some(ct) = content_type {
            query = query.bind(ct.to_string());
        }
        let (total, posted) = query.fetch_one(&self.pool).await?;
        let total = total.max(0) as u64;
        let posted = posted.max(0) as u64;
        Ok(StoreCounts {
            total,
            posted,
            unposted: total.saturating_sub(posted),
        })
    }

    async fn try_select_unposted(
        &self,
        content_type: Option<ContentType>,
        filter: &CategoryFilter,
        limit: u32,
    ) -> Result<Vec<ContentItem>> {
        let patterns = filter.patterns();
        let mut sql = String::from("SELECT * FROM content_items WHERE posted = 0");
        if content_type.is_some() {
            sql.push_str(" AND content_type = ?");
        }
        if !patterns.is_empty() {
            let clauses = vec!["category LIKE ? ESCAPE '\\'"; patterns.len()].join(" OR ");
            sql.push_str(&format!(" AND ({})", clauses));
        }
        sql.push_str(" ORDER BY RANDOM() LIMIT ?");

        let mut query = sqlx::query_as::<_, ItemRow>(&sql);
        if let Some(ct) = content_type {
            query = query.bind(ct.to_string());
        }
        for pattern in patterns {
            query = query.bind(pattern);
        }
        let rows = query.bind(i64::from(limit)).fetch_all(&self.pool).await?;
        rows.into_iter().map(ContentItem::try_from).collect()
    }
}

#[async_trait]
impl ItemStore for ContentStore {
    async fn insert(&self, item: &NewItem) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO content_items (title, url, content_type, category, source_module, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(title, content_type, source_module) DO NOTHING
            "#,
        )
        .bind(&item.title)
        .bind(&item.url)
        .bind(item.content_type.to_string())
        .bind(&item.category)
        .bind(&item.source_module)
        .bind(serde_json::to_string(&item.metadata)?)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Duplicate {} skipped: {}", item.content_type, item.title);
            return Ok(InsertOutcome::Duplicate);
        }
        Ok(InsertOutcome::Inserted(result.last_insert_rowid()))
    }

    async fn find(
        &self,
        title: &str,
        content_type: ContentType,
        source_module: &str,
    ) -> Result<Option<ContentItem>> {
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT * FROM content_items WHERE title = ? AND content_type = ? AND source_module = ?",
        )
        .bind(title)
        .bind(content_type.to_string())
        .bind(source_module)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ContentItem::try_from).transpose()
    }

    async fn select_random_unposted(
        &self,
        content_type: Option<ContentType>,
        filter: &CategoryFilter,
    ) -> Option<ContentItem> {
        match self.try_select_unposted(content_type, filter, 1).await {
            Ok(mut items) => items.pop(),
            Err(e) => {
                warn!("Candidate selection failed, treating as empty: {}", e);
                None
            }
        }
    }

    async fn select_unposted_batch(
        &self,
        content_type: Option<ContentType>,
        filter: &CategoryFilter,
        limit: u32,
    ) -> Vec<ContentItem> {
        match self.try_select_unposted(content_type, filter, limit).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Batch selection failed, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    async fn mark_posted(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE content_items SET posted = 1, post_date = ? WHERE id = ? AND posted = 0",
        )
        .bind(format_timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        let changed = result.rows_affected() == 1;
        if changed {
            info!("Marked item {} as posted", id);
        } else {
            debug!("Item {} not marked: missing or already posted", id);
        }
        Ok(changed)
    }
}
