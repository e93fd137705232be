//! Default values for configuration

use super::RetryConfig;
use crate::retry::Backoff;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Default log level when RUST_LOG is unset
pub fn default_log_level() -> String {
    "info".to_string()
}

/// Default: write a log file next to the config
pub fn default_log_to_file() -> bool {
    true
}

/// Rotate the log file at 10 MB
pub fn default_log_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

/// Keep five rotated log files
pub fn default_log_max_files() -> usize {
    5
}

/// Default: mask secret values in log output
pub fn default_mask_secrets() -> bool {
    true
}

pub fn default_telegram_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

pub fn default_telegram_channel_env() -> String {
    "CHANNEL_ID".to_string()
}

pub fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

/// Telegram retries: 3 attempts, 30 seconds apart
pub fn default_telegram_retry() -> RetryConfig {
    RetryConfig {
        attempts: 3,
        delay_secs: 30,
        backoff: Backoff::Constant,
    }
}

pub fn default_llm_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

pub fn default_llm_model() -> String {
    "gemini-2.5-flash".to_string()
}

pub fn default_llm_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

/// Default: ground answers with Google Search
pub fn default_llm_grounding() -> bool {
    true
}

/// Generator retries: 3 attempts, waiting 30s then 60s
pub fn default_llm_retry() -> RetryConfig {
    RetryConfig {
        attempts: 3,
        delay_secs: 30,
        backoff: Backoff::Linear,
    }
}

/// Regenerations allowed when a pipeline rejects the generated text
pub fn default_validation_attempts() -> u32 {
    3
}

/// Default request timeout in seconds
pub fn default_timeout_secs() -> u64 {
    60
}

/// Default user agent sent to Wikimedia endpoints
pub fn default_user_agent() -> String {
    format!(
        "agentparl/{} (https://github.com/agentparl/agentparl)",
        env!("CARGO_PKG_VERSION")
    )
}

pub fn default_wikipedia_api_template() -> String {
    "https://{lang}.wikipedia.org/w/api.php".to_string()
}

pub fn default_wikipedia_metrics_base() -> String {
    "https://wikimedia.org/api/rest_v1/metrics".to_string()
}

pub fn default_sparql_endpoint() -> String {
    "https://query.wikidata.org/sparql".to_string()
}

pub fn default_commons_file_base() -> String {
    "https://api.wikimedia.org/core/v1/commons/file".to_string()
}

/// Wikipedia editions searched for article images, in order
pub fn default_image_languages() -> Vec<String> {
    strings(&["en", "de", "fr", "it", "es", "nl"])
}

/// Requests per second against Wikimedia APIs
pub fn default_wikipedia_rate_limit() -> f64 {
    1.0
}

pub fn default_youtube_api_key_env() -> String {
    "YOUTUBE_API_KEY".to_string()
}

pub fn default_youtube_api_base() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

pub fn default_feed_urls() -> Vec<String> {
    strings(&[
        "https://www.techradar.com/rss",
        "https://research.google/blog/rss/",
        "https://www.marktechpost.com/feed/",
        "https://machinelearningmastery.com/feed/",
        "https://bair.berkeley.edu/blog/feed.xml",
        "https://aws.amazon.com/blogs/aws/feed/",
        "https://azure.microsoft.com/en-us/blog/feed/",
        "https://cloud.google.com/blog/rss.xml",
        "https://cloudcomputing-today.com/feed/",
        "https://feeds.arstechnica.com/arstechnica/index/",
        "https://www.theverge.com/rss/index.xml",
        "https://news.ycombinator.com/rss",
        "https://www.infoworld.com/category/cloud-computing/index.rss",
        "https://www.corrierecomunicazioni.it/feed/",
        "https://inno3.it/feed/",
    ])
}

pub fn default_feed_category() -> String {
    "tech".to_string()
}

/// Quote categories for the nerd quote pipeline
pub fn default_nerd_quote_categories() -> Vec<String> {
    strings(&[
        "anime",
        "manga",
        "comics",
        "video games",
        "science fiction",
        "fantasy",
        "tabletop games",
        "animation",
        "japanese popular culture",
        "superhero fiction",
        "role-playing games",
        "collectible card games",
    ])
}

/// Wikipedia categories browsed for curiosities
pub fn default_curiosity_categories() -> Vec<String> {
    strings(&[
        "Anime",
        "Manga",
        "Comics",
        "Video_games",
        "Science_fiction",
        "Fantasy",
        "Tabletop_games",
        "Animation",
        "Japanese_popular_culture",
        "Superhero_fiction",
        "Role-playing_games",
        "Collectible_card_games",
    ])
}

pub fn default_wikipedia_lang() -> String {
    "en".to_string()
}

pub fn default_min_article_chars() -> usize {
    500
}

pub fn default_discovery_attempts() -> u32 {
    5
}

pub fn default_prompt_content_chars() -> usize {
    2000
}

pub fn default_curiosity_post_min() -> usize {
    200
}

pub fn default_curiosity_post_max() -> usize {
    500
}

pub fn default_news_max_candidates() -> u32 {
    30
}

pub fn default_top_news() -> u32 {
    5
}

pub fn default_hashtag_count() -> u32 {
    5
}

pub fn default_country_code() -> String {
    "IT".to_string()
}

pub fn default_most_viewed_days() -> u32 {
    7
}

pub fn default_top_articles() -> usize {
    5
}

pub fn default_excluded_pages() -> Vec<String> {
    strings(&[
        "Main_Page",
        "Special:Search",
        "Pagina_principale",
        "Speciale:Ricerca",
        "Wikipedia",
    ])
}

pub fn default_top_videos() -> u32 {
    10
}

pub fn default_professions() -> Vec<String> {
    strings(&[
        "comics artist",
        "cartoonist",
        "mangaka",
        "fantasy writer",
        "animator",
    ])
}

pub fn default_image_extensions() -> Vec<String> {
    strings(&["jpg", "jpeg", "png"])
}

/// Largest image accepted from the pending folder (5 MB)
pub fn default_max_image_bytes() -> u64 {
    5 * 1024 * 1024
}

pub fn default_caption_max_chars() -> usize {
    300
}

pub fn default_ps_content_min() -> usize {
    800
}

pub fn default_ps_content_max() -> usize {
    1200
}

pub fn default_include_free_games() -> bool {
    true
}
