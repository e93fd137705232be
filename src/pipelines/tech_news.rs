//! Tech news digest from the news store
//!
//! Every unposted item handed to the generator is marked posted after the
//! digest goes out, whether or not the model picked it, so the next digest
//! only sees fresh news.

use crate::config::TechNewsConfig;
use crate::error::Result;
use crate::generate::GenerationRequest;
use crate::orchestrator::{Pipeline, Prepared};
use crate::store::{CategoryFilter, ContentItem, ContentType, ItemStore, StoreKind};
use async_trait::async_trait;
use tracing::info;

const SYSTEM_INSTRUCTION: &str = "\
You are an AI assistant and your task is to create a concise and engaging Telegram post that summarizes the most relevant news items from the provided list.
The format of the news items MUST BE as follows:

#TechNews #LatestUpdates #TechTrends

1. [TITLE]([URL])
   [HASHTAGS RELATED TO THE NEWS ITEM]
   [PUBLISHED DATE OF THE NEWS]
   [SHORT DESCRIPTION IN ITALIAN OF THE NEWS AND WHY IT'S IMPORTANT]

... (repeat for each news item)

IMPORTANT: Do not include any other text or explanation.";

pub struct TechNewsPipeline {
    settings: TechNewsConfig,
}

impl TechNewsPipeline {
    pub fn new(settings: TechNewsConfig) -> Self {
        Self { settings }
    }
}

pub(crate) fn digest_prompt(items: &[ContentItem], top_news: u32, hashtag_count: u32) -> String {
    let mut prompt = format!(
        "Select the {} most relevant news items, add {} hashtags and generate a short, engaging Telegram post summarizing them:\n\n",
        top_news, hashtag_count
    );
    for item in items {
        prompt.push_str(&format!(
            " - Title: {} URL: {} Published Date: {}\n\n",
            item.title,
            item.url.as_deref().unwrap_or("n/a"),
            item.meta_str("published").unwrap_or("unknown")
        ));
    }
    prompt
}

#[async_trait]
impl Pipeline for TechNewsPipeline {
    fn name(&self) -> &str {
        "tech-news"
    }

    fn store_kind(&self) -> Option<StoreKind> {
        Some(StoreKind::News)
    }

    async fn prepare(&self, store: Option<&dyn ItemStore>) -> Result<Option<Prepared>> {
        let Some(store) = store else {
            return Ok(None);
        };
        let filter = CategoryFilter::any_of([self.settings.category.clone()]);
        let batch = store
            .select_unposted_batch(Some(ContentType::News), &filter, self.settings.max_candidates)
            .await;
        if batch.is_empty() {
            return Ok(None);
        }

        info!("Building digest from {} unposted news items", batch.len());
        let prompt = digest_prompt(&batch, self.settings.top_news, self.settings.hashtag_count);
        let ids = batch.iter().map(|item| item.id).collect();
        Ok(Some(
            Prepared::new(GenerationRequest::text(SYSTEM_INSTRUCTION, prompt)).tracking(ids),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ContentStore, NewItem};
    use serde_json::json;
    use tempfile::TempDir;

    fn settings(max_candidates: u32) -> TechNewsConfig {
        TechNewsConfig {
            max_candidates,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_batch_is_tracked_and_bounded() {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::open(&tmp.path().join("news.db")).await.unwrap();
        for i in 0..5 {
            store
                .insert(
                    &NewItem::new(format!("News {}", i), ContentType::News, "feed_store")
                        .with_url(format!("https://example.com/{}", i))
                        .with_category("tech")
                        .with_metadata(json!({"published": "2025-06-10T04:00:00+00:00"})),
                )
                .await
                .unwrap();
        }
        store
            .insert(&NewItem::new("Calcio", ContentType::News, "feed_store").with_category("sport"))
            .await
            .unwrap();

        let pipeline = TechNewsPipeline::new(settings(3));
        let prepared = pipeline.prepare(Some(&store)).await.unwrap().unwrap();
        assert_eq!(prepared.tracked_ids.len(), 3);

        let prompt = prepared.request.prompt_text();
        assert!(prompt.starts_with("Select the 5 most relevant news items, add 5 hashtags"));
        assert_eq!(prompt.matches(" - Title: News").count(), 3);
        assert!(prompt.contains("Published Date: 2025-06-10T04:00:00+00:00"));
        assert!(!prompt.contains("Calcio"));
    }

    #[tokio::test]
    async fn test_empty_news_store() {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::open(&tmp.path().join("news.db")).await.unwrap();
        let pipeline = TechNewsPipeline::new(settings(30));
        assert!(pipeline.prepare(Some(&store)).await.unwrap().is_none());
    }
}
