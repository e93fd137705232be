//! Configuration management for agentparl
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! Secrets never live in the file: each section names the environment
//! variable holding its credential, and a `.env` file next to the config is
//! loaded into the environment on startup.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use crate::retry::{Backoff, RetryPolicy};
use crate::store::StoreKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where data (databases, images) lives
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Telegram publisher configuration
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Gemini generator configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Wikipedia / Wikidata / Wikimedia endpoints
    #[serde(default)]
    pub wikipedia: WikipediaConfig,

    /// YouTube Data API configuration
    #[serde(default)]
    pub youtube: YoutubeConfig,

    /// RSS/Atom feeds collected by `feed-store`
    #[serde(default)]
    pub feeds: FeedsConfig,

    /// Per-pipeline settings
    #[serde(default)]
    pub pipelines: PipelinesConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Shared retry settings for the HTTP collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub attempts: u32,

    /// Base delay between attempts in seconds
    pub delay_secs: u64,

    /// How the delay grows with each attempt
    pub backoff: Backoff,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.attempts,
            base_delay: Duration::from_secs(self.delay_secs),
            backoff: self.backoff,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory; relative paths are resolved against the config directory.
    /// Defaults to `<base_dir>/data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset (e.g. "info", "agentparl=debug")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,

    /// Also write logs to `<base_dir>/logs/agentparl.log`
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,

    /// Rotate the log file once it grows past this many bytes
    #[serde(default = "default_log_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Number of rotated files to keep
    #[serde(default = "default_log_max_files")]
    pub max_files: usize,

    /// Replace secret values with asterisks before writing
    #[serde(default = "default_mask_secrets")]
    pub mask_secrets: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Environment variable holding the bot token
    #[serde(default = "default_telegram_token_env")]
    pub bot_token_env: String,

    /// Environment variable holding the destination chat id
    #[serde(default = "default_telegram_channel_env")]
    pub channel_id_env: String,

    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_telegram_retry")]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Environment variable holding the Gemini API key
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_api_base")]
    pub api_base: String,

    /// Attach the Google Search grounding tool to every request
    #[serde(default = "default_llm_grounding")]
    pub grounding: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How many times a pipeline may ask for a new text when validation fails
    #[serde(default = "default_validation_attempts")]
    pub validation_attempts: u32,

    #[serde(default = "default_llm_retry")]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikipediaConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Action API URL; `{lang}` is replaced by the edition code
    #[serde(default = "default_wikipedia_api_template")]
    pub api_url_template: String,

    #[serde(default = "default_wikipedia_metrics_base")]
    pub metrics_base: String,

    #[serde(default = "default_sparql_endpoint")]
    pub sparql_endpoint: String,

    #[serde(default = "default_commons_file_base")]
    pub commons_file_base: String,

    /// Editions searched when looking for an article image
    #[serde(default = "default_image_languages")]
    pub image_languages: Vec<String>,

    #[serde(default = "default_wikipedia_rate_limit")]
    pub requests_per_second: f64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// Environment variable holding the YouTube Data API key
    #[serde(default = "default_youtube_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_youtube_api_base")]
    pub api_base: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    #[serde(default = "default_feed_urls")]
    pub urls: Vec<String>,

    /// Category stored on every collected news item
    #[serde(default = "default_feed_category")]
    pub category: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelinesConfig {
    #[serde(default)]
    pub quote: QuoteConfig,

    #[serde(default = "QuoteConfig::nerd")]
    pub nerd_quote: QuoteConfig,

    #[serde(default)]
    pub curiosity: CuriosityConfig,

    #[serde(default)]
    pub tech_news: TechNewsConfig,

    #[serde(default)]
    pub most_viewed: MostViewedConfig,

    #[serde(default)]
    pub youtube_trend: YoutubeTrendConfig,

    #[serde(default)]
    pub happened_today: HappenedTodayConfig,

    #[serde(default)]
    pub post_image: PostImageConfig,

    #[serde(default)]
    pub ps_news: PsNewsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Only quotes whose category contains one of these strings are picked.
    /// Empty means any category.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl QuoteConfig {
    pub fn nerd() -> Self {
        Self {
            categories: default_nerd_quote_categories(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuriosityConfig {
    #[serde(default = "default_curiosity_categories")]
    pub categories: Vec<String>,

    #[serde(default = "default_wikipedia_lang")]
    pub lang: String,

    /// Articles shorter than this are skipped during discovery
    #[serde(default = "default_min_article_chars")]
    pub min_article_chars: usize,

    #[serde(default = "default_discovery_attempts")]
    pub discovery_attempts: u32,

    /// Article text is truncated to this many characters in the prompt
    #[serde(default = "default_prompt_content_chars")]
    pub prompt_content_chars: usize,

    #[serde(default = "default_curiosity_post_min")]
    pub post_min_chars: usize,

    #[serde(default = "default_curiosity_post_max")]
    pub post_max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechNewsConfig {
    #[serde(default = "default_feed_category")]
    pub category: String,

    /// Upper bound on unposted items handed to the generator in one digest
    #[serde(default = "default_news_max_candidates")]
    pub max_candidates: u32,

    #[serde(default = "default_top_news")]
    pub top_news: u32,

    #[serde(default = "default_hashtag_count")]
    pub hashtag_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MostViewedConfig {
    #[serde(default = "default_country_code")]
    pub country: String,

    #[serde(default = "default_most_viewed_days")]
    pub days: u32,

    #[serde(default = "default_top_articles")]
    pub top_n: usize,

    #[serde(default = "default_excluded_pages")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeTrendConfig {
    #[serde(default = "default_country_code")]
    pub country: String,

    #[serde(default = "default_top_videos")]
    pub max_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HappenedTodayConfig {
    /// Profession names; see `sources::wikidata::profession_qid`
    #[serde(default = "default_professions")]
    pub professions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostImageConfig {
    #[serde(default = "default_image_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,

    #[serde(default = "default_caption_max_chars")]
    pub caption_max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsNewsConfig {
    #[serde(default = "default_ps_content_min")]
    pub content_min_chars: usize,

    #[serde(default = "default_ps_content_max")]
    pub content_max_chars: usize,

    #[serde(default = "default_include_free_games")]
    pub include_free_games: bool,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for agentparl (config, .env, logs)
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Optional `.env` with secrets
    pub env_file: PathBuf,

    /// Log directory
    pub log_dir: PathBuf,

    /// Data root
    pub data_dir: PathBuf,
}

impl PathsConfig {
    fn resolve(base: PathBuf, config_file: PathBuf, data_dir: Option<&Path>) -> Self {
        let data_dir = match data_dir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => base.join(dir),
            None => base.join("data"),
        };
        Self {
            env_file: base.join(".env"),
            log_dir: base.join("logs"),
            config_file,
            data_dir,
            base_dir: base,
        }
    }

    pub fn databases_dir(&self) -> PathBuf {
        self.data_dir.join("databases")
    }

    pub fn images_pending_dir(&self) -> PathBuf {
        self.data_dir.join("images").join("pending")
    }

    pub fn images_posted_dir(&self) -> PathBuf {
        self.data_dir.join("images").join("posted")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            telegram: TelegramConfig::default(),
            llm: LlmConfig::default(),
            wikipedia: WikipediaConfig::default(),
            youtube: YoutubeConfig::default(),
            feeds: FeedsConfig::default(),
            pipelines: PipelinesConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for PipelinesConfig {
    fn default() -> Self {
        Self {
            quote: QuoteConfig::default(),
            nerd_quote: QuoteConfig::nerd(),
            curiosity: CuriosityConfig::default(),
            tech_news: TechNewsConfig::default(),
            most_viewed: MostViewedConfig::default(),
            youtube_trend: YoutubeTrendConfig::default(),
            happened_today: HappenedTodayConfig::default(),
            post_image: PostImageConfig::default(),
            ps_news: PsNewsConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            to_file: default_log_to_file(),
            max_file_bytes: default_log_max_file_bytes(),
            max_files: default_log_max_files(),
            mask_secrets: default_mask_secrets(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_telegram_token_env(),
            channel_id_env: default_telegram_channel_env(),
            api_base: default_telegram_api_base(),
            timeout_secs: default_timeout_secs(),
            retry: default_telegram_retry(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_llm_api_key_env(),
            model: default_llm_model(),
            api_base: default_llm_api_base(),
            grounding: default_llm_grounding(),
            timeout_secs: 120,
            retry: default_llm_retry(),
            validation_attempts: default_validation_attempts(),
        }
    }
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            api_url_template: default_wikipedia_api_template(),
            metrics_base: default_wikipedia_metrics_base(),
            sparql_endpoint: default_sparql_endpoint(),
            commons_file_base: default_commons_file_base(),
            image_languages: default_image_languages(),
            requests_per_second: default_wikipedia_rate_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_youtube_api_key_env(),
            api_base: default_youtube_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            urls: default_feed_urls(),
            category: default_feed_category(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CuriosityConfig {
    fn default() -> Self {
        Self {
            categories: default_curiosity_categories(),
            lang: default_wikipedia_lang(),
            min_article_chars: default_min_article_chars(),
            discovery_attempts: default_discovery_attempts(),
            prompt_content_chars: default_prompt_content_chars(),
            post_min_chars: default_curiosity_post_min(),
            post_max_chars: default_curiosity_post_max(),
        }
    }
}

impl Default for TechNewsConfig {
    fn default() -> Self {
        Self {
            category: default_feed_category(),
            max_candidates: default_news_max_candidates(),
            top_news: default_top_news(),
            hashtag_count: default_hashtag_count(),
        }
    }
}

impl Default for MostViewedConfig {
    fn default() -> Self {
        Self {
            country: default_country_code(),
            days: default_most_viewed_days(),
            top_n: default_top_articles(),
            exclude: default_excluded_pages(),
        }
    }
}

impl Default for YoutubeTrendConfig {
    fn default() -> Self {
        Self {
            country: default_country_code(),
            max_results: default_top_videos(),
        }
    }
}

impl Default for HappenedTodayConfig {
    fn default() -> Self {
        Self {
            professions: default_professions(),
        }
    }
}

impl Default for PostImageConfig {
    fn default() -> Self {
        Self {
            extensions: default_image_extensions(),
            max_image_bytes: default_max_image_bytes(),
            caption_max_chars: default_caption_max_chars(),
        }
    }
}

impl Default for PsNewsConfig {
    fn default() -> Self {
        Self {
            content_min_chars: default_ps_content_min(),
            content_max_chars: default_ps_content_max(),
            include_free_games: default_include_free_games(),
        }
    }
}

impl Config {
    /// Get the default base directory for agentparl (~/.agentparl)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".agentparl")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        let config_file = base.join("config.toml");
        self.paths = PathsConfig::resolve(base, config_file, self.storage.data_dir.as_deref());
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig::resolve(
            base,
            config_path.to_path_buf(),
            config.storage.data_dir.as_deref(),
        );

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            return Self::load(&config.paths.config_file.clone());
        }

        debug!("No config file found, using defaults");
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Load `<base_dir>/.env` into the process environment, if present.
    /// Variables already set in the environment win.
    pub fn load_env_file(&self) -> Result<bool> {
        if !self.paths.env_file.exists() {
            return Ok(false);
        }
        dotenvy::from_path(&self.paths.env_file)
            .map_err(|e| Error::Config(format!("Invalid .env file: {}", e)))?;
        debug!("Loaded environment from {:?}", self.paths.env_file);
        Ok(true)
    }

    /// SQLite file backing the given store
    pub fn store_path(&self, kind: StoreKind) -> PathBuf {
        self.paths.databases_dir().join(kind.file_name())
    }

    pub fn telegram_bot_token(&self) -> Result<String> {
        require_env(&self.telegram.bot_token_env)
    }

    pub fn telegram_channel_id(&self) -> Result<String> {
        require_env(&self.telegram.channel_id_env)
    }

    pub fn llm_api_key(&self) -> Result<String> {
        require_env(&self.llm.api_key_env)
    }

    pub fn youtube_api_key(&self) -> Result<String> {
        require_env(&self.youtube.api_key_env)
    }

    /// Values of every configured secret currently present in the environment
    pub fn secret_values(&self) -> Vec<String> {
        [
            &self.telegram.bot_token_env,
            &self.llm.api_key_env,
            &self.youtube.api_key_env,
        ]
        .into_iter()
        .filter_map(|name| std::env::var(name).ok())
        .filter(|value| !value.trim().is_empty())
        .collect()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, retry) in [("telegram", &self.telegram.retry), ("llm", &self.llm.retry)] {
            if retry.attempts == 0 {
                return Err(Error::Config(format!(
                    "{}.retry.attempts must be at least 1",
                    name
                )));
            }
        }

        if self.llm.validation_attempts == 0 {
            return Err(Error::Config(
                "llm.validation_attempts must be at least 1".to_string(),
            ));
        }

        for (name, value) in [
            ("telegram.api_base", &self.telegram.api_base),
            ("llm.api_base", &self.llm.api_base),
            ("wikipedia.metrics_base", &self.wikipedia.metrics_base),
            ("wikipedia.sparql_endpoint", &self.wikipedia.sparql_endpoint),
            ("youtube.api_base", &self.youtube.api_base),
        ] {
            Url::parse(value)
                .map_err(|e| Error::Config(format!("{} is not a valid URL: {}", name, e)))?;
        }

        if !self.wikipedia.api_url_template.contains("{lang}") {
            return Err(Error::Config(
                "wikipedia.api_url_template must contain {lang}".to_string(),
            ));
        }

        if self.wikipedia.requests_per_second <= 0.0 {
            return Err(Error::Config(
                "wikipedia.requests_per_second must be positive".to_string(),
            ));
        }

        if self.logging.max_files == 0 || self.logging.max_file_bytes == 0 {
            return Err(Error::Config(
                "logging.max_files and logging.max_file_bytes must be positive".to_string(),
            ));
        }

        let curiosity = &self.pipelines.curiosity;
        if curiosity.categories.is_empty() {
            return Err(Error::Config(
                "pipelines.curiosity.categories must not be empty".to_string(),
            ));
        }
        if curiosity.post_min_chars > curiosity.post_max_chars {
            return Err(Error::Config(
                "pipelines.curiosity.post_min_chars must be <= post_max_chars".to_string(),
            ));
        }

        let ps = &self.pipelines.ps_news;
        if ps.content_min_chars > ps.content_max_chars {
            return Err(Error::Config(
                "pipelines.ps_news.content_min_chars must be <= content_max_chars".to_string(),
            ));
        }

        if self.pipelines.tech_news.max_candidates == 0 {
            return Err(Error::Config(
                "pipelines.tech_news.max_candidates must be positive".to_string(),
            ));
        }

        if self.pipelines.most_viewed.days == 0 || self.pipelines.most_viewed.top_n == 0 {
            return Err(Error::Config(
                "pipelines.most_viewed.days and top_n must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!(
            "Environment variable {} is not set",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.telegram.retry.attempts, 3);
        assert_eq!(config.telegram.retry.delay_secs, 30);
        assert!(config.pipelines.quote.categories.is_empty());
        assert!(!config.pipelines.nerd_quote.categories.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.llm.model = "gemini-test".to_string();
        config.pipelines.quote.categories = vec!["science".to_string()];

        config.save().unwrap();
        assert!(config.paths.config_file.exists());

        let loaded = Config::load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(loaded.llm.model, "gemini-test");
        assert_eq!(loaded.pipelines.quote.categories, vec!["science".to_string()]);
        assert_eq!(loaded.paths.data_dir, tmp.path().join("data"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\ndata_dir = \"/srv/agentparl\"\n\n[pipelines.most_viewed]\ncountry = \"FR\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.pipelines.most_viewed.country, "FR");
        assert_eq!(config.pipelines.most_viewed.top_n, 5);
        assert_eq!(config.paths.data_dir, PathBuf::from("/srv/agentparl"));
        assert_eq!(
            config.store_path(StoreKind::Quotes),
            PathBuf::from("/srv/agentparl/databases/quotes.db")
        );
        assert_eq!(config.telegram.bot_token_env, "TELEGRAM_BOT_TOKEN");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.telegram.retry.attempts = 0;
        assert!(config.validate().is_err());
        config.telegram.retry.attempts = 1;
        assert!(config.validate().is_ok());

        config.pipelines.curiosity.post_min_chars = 600;
        assert!(config.validate().is_err());
        config.pipelines.curiosity.post_min_chars = 200;

        config.llm.api_base = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let mut config = Config::default();
        config.llm.api_key_env = "AGENTPARL_TEST_UNSET_KEY_4F2A".to_string();
        let err = config.llm_api_key().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("AGENTPARL_TEST_UNSET_KEY_4F2A"));
    }
}
