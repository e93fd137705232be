//! Weekly most viewed Wikipedia pages for one country

use crate::config::MostViewedConfig;
use crate::error::Result;
use crate::generate::GenerationRequest;
use crate::orchestrator::{Pipeline, Prepared};
use crate::sources::{ArticleViews, WikipediaClient};
use crate::store::{ItemStore, StoreKind};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use tracing::info;

const SYSTEM_INSTRUCTION: &str = "\
You are an AI assistant specialized in summarizing news articles and generating content for social media in ITALIAN.
Respond only with the final report, ready to be posted on Telegram, formatted as follows:

#WikipediaTrends <DATE> 📅

<EMOTICON NUMBER 1> Article Title 1 <EMOTICON RELEVANT TO THE ARTICLE>
<EMOTICON EYES> Views: X
<EMOTICON QUESTION MARK> **<COSA or CHI ACCORDING TO THE SUBJECT> è**: <SHORT DESCRIPTION OF THE ARTICLE>
<EMOTICON LIGHT_BULB> **Perché è in trend**: <REASON WHY THIS ARTICLE IS TRENDING>

<EMOTICON NUMBER 2> Article Title 2 <EMOTICON RELEVANT TO THE ARTICLE>
<EMOTICON EYES> Views: Y
<EMOTICON QUESTION MARK> **<COSA or CHI ACCORDING TO THE SUBJECT> è**: <SHORT DESCRIPTION OF THE ARTICLE>
<EMOTICON LIGHT_BULB> **Perché è in trend**: <REASON WHY THIS ARTICLE IS TRENDING>
...
Do not include any other text or explanation.";

pub struct MostViewedPipeline {
    wiki: WikipediaClient,
    settings: MostViewedConfig,
}

impl MostViewedPipeline {
    pub fn new(wiki: WikipediaClient, settings: MostViewedConfig) -> Self {
        Self { wiki, settings }
    }
}

pub(crate) fn trends_prompt(ranked: &[ArticleViews], today: NaiveDate) -> String {
    let mut prompt = format!(
        "These are the trending Wikipedia articles from last week (today is {}):\n",
        today.format("%d/%m/%Y")
    );
    for article in ranked {
        prompt.push_str(&format!(
            "titolo: {}\nviews: {}\n\n",
            article.title.replace('_', " "),
            article.views
        ));
    }
    prompt
}

#[async_trait]
impl Pipeline for MostViewedPipeline {
    fn name(&self) -> &str {
        "most-viewed"
    }

    fn store_kind(&self) -> Option<StoreKind> {
        None
    }

    async fn prepare(&self, _store: Option<&dyn ItemStore>) -> Result<Option<Prepared>> {
        let ranked = self
            .wiki
            .top_articles_over_days(
                &self.settings.country,
                self.settings.days,
                &self.settings.exclude,
                self.settings.top_n,
            )
            .await?;
        if ranked.is_empty() {
            return Ok(None);
        }
        for (rank, article) in ranked.iter().enumerate() {
            info!("#{} {} ({} views)", rank + 1, article.title, article.views);
        }

        let prompt = trends_prompt(&ranked, Local::now().date_naive());
        Ok(Some(Prepared::new(GenerationRequest::text(
            SYSTEM_INSTRUCTION,
            prompt,
        ))))
    }
}
