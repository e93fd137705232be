//! Monthly PlayStation Plus games, answered with search grounding

use crate::config::PsNewsConfig;
use crate::error::Result;
use crate::generate::GenerationRequest;
use crate::orchestrator::{Pipeline, Prepared};
use crate::store::{ItemStore, StoreKind};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};

const SYSTEM_INSTRUCTION: &str = "\
You are an AI assistant specialized in video game news and in writing content for social media in ITALIAN.
Search for the monthly PlayStation Plus Essential games and respond only with the final post, ready to be published on Telegram, formatted as follows:

#PSPlus <MONTH> <YEAR> 🎮

<EMOTICON> <GAME TITLE 1> (<PLATFORMS>)
<SHORT DESCRIPTION OF THE GAME>

<EMOTICON> <GAME TITLE 2> (<PLATFORMS>)
<SHORT DESCRIPTION OF THE GAME>
...
<AVAILABILITY PERIOD OF THE GAMES>";

const FREE_GAMES_NOTE: &str = "Include information about free games if available.";
const ESSENTIAL_ONLY_NOTE: &str = "Focus only on main PS Plus Essential games.";

pub struct PsNewsPipeline {
    settings: PsNewsConfig,
}

impl PsNewsPipeline {
    pub fn new(settings: PsNewsConfig) -> Self {
        Self { settings }
    }

    fn system_instruction(&self) -> String {
        let scope = if self.settings.include_free_games {
            FREE_GAMES_NOTE
        } else {
            ESSENTIAL_ONLY_NOTE
        };
        format!(
            "{}\n\n{}\nKeep the content between {} and {} characters.\nDo not include any other text or explanation.",
            SYSTEM_INSTRUCTION,
            scope,
            self.settings.content_min_chars,
            self.settings.content_max_chars
        )
    }
}

pub(crate) fn monthly_query(today: NaiveDate) -> String {
    format!(
        "What are the monthly games on PS Plus Essential for {}?",
        today.format("%B %Y")
    )
}

#[async_trait]
impl Pipeline for PsNewsPipeline {
    fn name(&self) -> &str {
        "ps-news"
    }

    fn store_kind(&self) -> Option<StoreKind> {
        None
    }

    fn needs_search(&self) -> bool {
        true
    }

    async fn prepare(&self, _store: Option<&dyn ItemStore>) -> Result<Option<Prepared>> {
        let query = monthly_query(Local::now().date_naive());
        Ok(Some(Prepared::new(GenerationRequest::text(
            self.system_instruction(),
            query,
        ))))
    }

    fn validate(&self, text: &str) -> std::result::Result<(), String> {
        if !text.contains("#PSPlus") {
            return Err("missing #PSPlus header".to_string());
        }
        let length = text.trim().chars().count();
        if length > self.settings.content_max_chars * 2 {
            return Err(format!("too long: {} characters", length));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monthly_query() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        assert_eq!(
            monthly_query(date),
            "What are the monthly games on PS Plus Essential for March 2025?"
        );
    }

    #[test]
    fn test_system_instruction_scope() {
        let with_free = PsNewsPipeline::new(PsNewsConfig::default());
        let instruction = with_free.system_instruction();
        assert!(instruction.contains(FREE_GAMES_NOTE));
        assert!(instruction.contains("between 800 and 1200 characters"));

        let essential = PsNewsPipeline::new(PsNewsConfig {
            include_free_games: false,
            ..Default::default()
        });
        assert!(essential.system_instruction().contains(ESSENTIAL_ONLY_NOTE));
    }

    #[tokio::test]
    async fn test_always_prepares_with_search() {
        let pipeline = PsNewsPipeline::new(PsNewsConfig::default());
        assert!(pipeline.needs_search());
        let prepared = pipeline.prepare(None).await.unwrap().unwrap();
        assert!(prepared.tracked_ids.is_empty());
        assert!(prepared.request.prompt_text().starts_with("What are the monthly games"));
    }

    #[test]
    fn test_validate_requires_header() {
        let pipeline = PsNewsPipeline::new(PsNewsConfig::default());
        assert!(pipeline.validate("#PSPlus Marzo 2025 🎮\n\nGioco").is_ok());
        assert!(pipeline.validate("PS Plus di marzo").is_err());
    }
}
