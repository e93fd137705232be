//! Content pipelines, one per post type
//!
//! A pipeline knows where its candidates come from and how to ask for the
//! message; the [`Orchestrator`](crate::orchestrator::Orchestrator) does
//! the rest.

pub mod curiosity;
pub mod happened_today;
pub mod most_viewed;
pub mod post_image;
pub mod ps_news;
pub mod quote;
pub mod tech_news;
pub mod youtube_trend;

pub use curiosity::CuriosityPipeline;
pub use happened_today::HappenedTodayPipeline;
pub use most_viewed::MostViewedPipeline;
pub use post_image::PostImagePipeline;
pub use ps_news::PsNewsPipeline;
pub use quote::QuotePipeline;
pub use tech_news::TechNewsPipeline;
pub use youtube_trend::YoutubeTrendPipeline;

use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::Pipeline;
use crate::sources::{ImageFolder, RequestLimiter, WikidataClient, WikipediaClient, YoutubeClient};
use unicode_segmentation::UnicodeSegmentation;

/// Every pipeline the CLI can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Quote,
    NerdQuote,
    Curiosity,
    TechNews,
    MostViewed,
    YoutubeTrend,
    HappenedToday,
    PostImage,
    PsNews,
}

impl PipelineKind {
    /// Build the pipeline and its source clients from configuration
    pub fn build(&self, config: &Config) -> Result<Box<dyn Pipeline>> {
        let settings = &config.pipelines;
        let pipeline: Box<dyn Pipeline> = match self {
            PipelineKind::Quote => Box::new(QuotePipeline::new("quote", &settings.quote)),
            PipelineKind::NerdQuote => {
                Box::new(QuotePipeline::new("nerd-quote", &settings.nerd_quote))
            }
            PipelineKind::Curiosity => Box::new(CuriosityPipeline::new(
                WikipediaClient::new(&config.wikipedia)?,
                settings.curiosity.clone(),
            )),
            PipelineKind::TechNews => Box::new(TechNewsPipeline::new(settings.tech_news.clone())),
            PipelineKind::MostViewed => Box::new(MostViewedPipeline::new(
                WikipediaClient::new(&config.wikipedia)?,
                settings.most_viewed.clone(),
            )),
            PipelineKind::YoutubeTrend => Box::new(YoutubeTrendPipeline::new(
                YoutubeClient::from_config(config)?,
                settings.youtube_trend.clone(),
            )),
            PipelineKind::HappenedToday => {
                let limiter = RequestLimiter::new(config.wikipedia.requests_per_second);
                Box::new(HappenedTodayPipeline::new(
                    WikidataClient::new(&config.wikipedia)?.with_limiter(limiter.clone()),
                    WikipediaClient::new(&config.wikipedia)?.with_limiter(limiter),
                    settings.happened_today.professions.clone(),
                ))
            }
            PipelineKind::PostImage => Box::new(PostImagePipeline::new(
                ImageFolder::from_config(config),
                settings.post_image.clone(),
            )),
            PipelineKind::PsNews => Box::new(PsNewsPipeline::new(settings.ps_news.clone())),
        };
        Ok(pipeline)
    }
}

/// First `max` user-perceived characters of `text`, with an ellipsis if
/// anything was cut. Emoji and combined accents are never split.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let mut cut: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() {
        cut.push_str("...");
    }
    cut
}

pub(crate) fn require_hashtag(text: &str) -> std::result::Result<(), String> {
    if text.contains('#') {
        Ok(())
    } else {
        Err("no hashtag in generated text".to_string())
    }
}
