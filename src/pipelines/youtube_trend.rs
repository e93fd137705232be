//! Trending YouTube videos, posted as HTML

use crate::config::YoutubeTrendConfig;
use crate::error::Result;
use crate::generate::GenerationRequest;
use crate::orchestrator::{Pipeline, Prepared};
use crate::publish::ParseMode;
use crate::sources::{TrendingVideo, YoutubeClient};
use crate::store::{ItemStore, StoreKind};
use async_trait::async_trait;
use tracing::debug;

const SYSTEM_INSTRUCTION: &str = "\
You are an AI assistant specialized in generating engaging content for social media in ITALIAN.
You will receive a list of trending YouTube videos with their titles, view counts, and links, as follows:
  ID:video_id_1
  TITLE:Video Title 1
  Views: X

  ID:video_id_2
  TITLE:Video Title 2
  Views: Y
  ...
Your task is to create a concise and engaging report formatted in HTML, suitable for posting on Telegram, summarizing the trending videos. Use relevant emoticons to enhance the presentation.
The format should be as follows:
  &#127909; &#128293; &#x23;YouTrends <DATE>
  1. &#129351; <a href='https://www.youtube.com/watch?v={ID}'>{TITLE}</a> - <Views> views
     SHORT DESCRIPTION OF THE VIDEO IN ITALIAN (1-2 SENTENCES) OR OF WHY IT IS TRENDING
  2. &#129352; <a href='https://www.youtube.com/watch?v={ID}'>{TITLE}</a> - <Views> views
     SHORT DESCRIPTION OF THE VIDEO IN ITALIAN (1-2 SENTENCES) OR OF WHY IT IS TRENDING
  3. &#129353; <a href='https://www.youtube.com/watch?v={ID}'>{TITLE}</a> - <Views> views
     SHORT DESCRIPTION OF THE VIDEO IN ITALIAN (1-2 SENTENCES) OR OF WHY IT IS TRENDING
  ...
Do not include any other text or explanation.";

pub struct YoutubeTrendPipeline {
    youtube: YoutubeClient,
    settings: YoutubeTrendConfig,
}

impl YoutubeTrendPipeline {
    pub fn new(youtube: YoutubeClient, settings: YoutubeTrendConfig) -> Self {
        Self { youtube, settings }
    }
}

pub(crate) fn videos_prompt(videos: &[TrendingVideo]) -> String {
    let mut prompt = String::from("These are the current trending YouTube videos:\n\n");
    for video in videos {
        let views = video
            .views
            .map(|v| v.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        prompt.push_str(&format!(
            "ID:{}\nTITLE:{}\nViews: {}\n\n",
            video.id, video.title, views
        ));
    }
    prompt
}

#[async_trait]
impl Pipeline for YoutubeTrendPipeline {
    fn name(&self) -> &str {
        "youtube-trend"
    }

    fn store_kind(&self) -> Option<StoreKind> {
        None
    }

    async fn prepare(&self, _store: Option<&dyn ItemStore>) -> Result<Option<Prepared>> {
        let videos = self
            .youtube
            .most_popular(&self.settings.country, self.settings.max_results)
            .await?;
        if videos.is_empty() {
            return Ok(None);
        }
        for video in &videos {
            debug!("Trending: {} ({:?} views)", video.title, video.views);
        }

        Ok(Some(
            Prepared::new(GenerationRequest::text(SYSTEM_INSTRUCTION, videos_prompt(&videos)))
                .with_parse_mode(ParseMode::Html),
        ))
    }
}
