//! Quote of the day, from the quotes store

use super::require_hashtag;
use crate::config::QuoteConfig;
use crate::error::Result;
use crate::generate::GenerationRequest;
use crate::orchestrator::{Pipeline, Prepared};
use crate::store::{CategoryFilter, ContentType, ItemStore, StoreKind};
use async_trait::async_trait;
use tracing::info;

const SYSTEM_INSTRUCTION: &str = "\
You are an AI assistant that generates hashtags for quotes and content for social media in ITALIAN.
Generate 3 relevant hashtags based on the quote and author provided. Use popular and trending hashtags where applicable.
Format the hashtags as a space-separated list, each starting with a # symbol, without any additional text or punctuation.
Respond only with the final report, ready to be posted on Telegram, formatted as follows:

#QuoteOfTheDay <GENERATED HASHTAGS>

***<QUOTE TEXT TRANSLATED IN ITALIAN>***
_<AUTHOR NAME>_

<SHORT DESCRIPTION OF THE AUTHOR AND WHERE THE QUOTE IS FROM>

Do not include any other text or explanation.";

pub struct QuotePipeline {
    name: String,
    filter: CategoryFilter,
}

impl QuotePipeline {
    pub fn new(name: &str, settings: &QuoteConfig) -> Self {
        Self {
            name: name.to_string(),
            filter: CategoryFilter::any_of(settings.categories.iter().cloned()),
        }
    }
}

pub(crate) fn quote_prompt(quote: &str, author: Option<&str>) -> String {
    format!("quote: {}\nauthor: {}", quote, author.unwrap_or("Unknown"))
}

#[async_trait]
impl Pipeline for QuotePipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn store_kind(&self) -> Option<StoreKind> {
        Some(StoreKind::Quotes)
    }

    async fn prepare(&self, store: Option<&dyn ItemStore>) -> Result<Option<Prepared>> {
        let Some(store) = store else {
            return Ok(None);
        };
        let Some(quote) = store
            .select_random_unposted(Some(ContentType::Quote), &self.filter)
            .await
        else {
            return Ok(None);
        };

        info!(
            "Selected quote {} by {} (category: {})",
            quote.id,
            quote.meta_str("author").unwrap_or("unknown author"),
            quote.category.as_deref().unwrap_or("none")
        );
        let prompt = quote_prompt(&quote.title, quote.meta_str("author"));
        Ok(Some(
            Prepared::new(GenerationRequest::text(SYSTEM_INSTRUCTION, prompt))
                .tracking(vec![quote.id]),
        ))
    }

    fn validate(&self, text: &str) -> std::result::Result<(), String> {
        require_hashtag(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::Part;
    use crate::store::{ContentStore, NewItem};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_prompt_format() {
        assert_eq!(
            quote_prompt("Fear is the mind-killer", Some("Frank Herbert")),
            "quote: Fear is the mind-killer\nauthor: Frank Herbert"
        );
        assert_eq!(quote_prompt("Anon", None), "quote: Anon\nauthor: Unknown");
    }

    #[tokio::test]
    async fn test_prepare_respects_categories() {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::open(&tmp.path().join("quotes.db")).await.unwrap();
        store
            .insert(
                &NewItem::new("Carpe diem", ContentType::Quote, "import")
                    .with_category("latin")
                    .with_metadata(json!({"author": "Orazio"})),
            )
            .await
            .unwrap();
        store
            .insert(
                &NewItem::new("May the Force be with you", ContentType::Quote, "import")
                    .with_category("sci-fi movies")
                    .with_metadata(json!({"author": "Obi-Wan"})),
            )
            .await
            .unwrap();

        let pipeline = QuotePipeline::new(
            "nerd-quote",
            &QuoteConfig {
                categories: vec!["Sci-Fi".to_string()],
            },
        );
        for _ in 0..5 {
            let prepared = pipeline.prepare(Some(&store)).await.unwrap().unwrap();
            assert_eq!(prepared.tracked_ids.len(), 1);
            assert_eq!(
                prepared.request.parts,
                vec![Part::Text(
                    "quote: May the Force be with you\nauthor: Obi-Wan".to_string()
                )]
            );
        }
    }

    #[tokio::test]
    async fn test_prepare_without_candidates() {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::open(&tmp.path().join("quotes.db")).await.unwrap();
        let pipeline = QuotePipeline::new("quote", &QuoteConfig::default());
        assert!(pipeline.prepare(Some(&store)).await.unwrap().is_none());
    }
}
