//! "Accadde oggi": an artist who died on this day, with a photo from
//! their Wikipedia article when one can be found

use crate::error::Result;
use crate::generate::GenerationRequest;
use crate::media::ImageData;
use crate::orchestrator::{Pipeline, Prepared};
use crate::sources::{DeathRecord, WikidataClient, WikipediaClient};
use crate::store::{ItemStore, StoreKind};
use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

const SYSTEM_INSTRUCTION: &str = "\
You are an AI assistant specialized in writing content for social media in ITALIAN.
You will receive a list of artists who died today in history. Choose the most relevant one and respond only with the final post, ready to be published on Telegram, formatted as follows:

#AccaddeOggi <DD MMM> 📅

**<FULL NAME OF THE ARTIST>**

Nato il <DATE OF BIRTH> - Morto il <DATE OF DEATH>
Premi Ricevuti: <AWARDS>

<LONG DESCRIPTION OF THE ARTIST, THEIR WORKS AND THEIR LEGACY>

Do not include any other text or explanation.";

const MIN_POST_CHARS: usize = 50;

pub struct HappenedTodayPipeline {
    wikidata: WikidataClient,
    wiki: WikipediaClient,
    professions: Vec<String>,
}

impl HappenedTodayPipeline {
    pub fn new(wikidata: WikidataClient, wiki: WikipediaClient, professions: Vec<String>) -> Self {
        Self {
            wikidata,
            wiki,
            professions,
        }
    }
}

pub(crate) fn deaths_prompt(records: &[DeathRecord]) -> String {
    let mut prompt = String::from(
        "This is a list of famous comics artists, cartoonists, mangaka, fantasy writers and animators who died today in history:\n",
    );
    for record in records {
        prompt.push_str(&format!(
            "- {} ({}): {}. Award received: {}\n",
            record.name,
            record.date_of_death.as_deref().unwrap_or("unknown date"),
            record.description.as_deref().unwrap_or("no description"),
            record.award.as_deref().unwrap_or("none")
        ));
    }
    prompt.push_str(
        "\n\nChoose the most relevant artist and generate a long and detailed description for him.\n",
    );
    prompt
}

/// The first bold span of the post, which the format reserves for the name
pub(crate) fn featured_name(text: &str) -> Option<String> {
    let bold = Regex::new(r"\*\*([^*\n]+)\*\*").ok()?;
    bold.captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl Pipeline for HappenedTodayPipeline {
    fn name(&self) -> &str {
        "happened-today"
    }

    fn store_kind(&self) -> Option<StoreKind> {
        None
    }

    async fn prepare(&self, _store: Option<&dyn ItemStore>) -> Result<Option<Prepared>> {
        let records = self.wikidata.deaths_on_this_day(&self.professions).await?;
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(Prepared::new(GenerationRequest::text(
            SYSTEM_INSTRUCTION,
            deaths_prompt(&records),
        ))))
    }

    fn validate(&self, text: &str) -> std::result::Result<(), String> {
        let length = text.trim().chars().count();
        if length < MIN_POST_CHARS {
            return Err(format!("too short: {} characters", length));
        }
        Ok(())
    }

    async fn illustrate(&self, _prepared: &Prepared, text: &str) -> Option<ImageData> {
        let Some(name) = featured_name(text) else {
            warn!("No featured name in generated text, posting without image");
            return None;
        };
        info!("Looking for a picture of {}", name);
        match self.wiki.random_article_image(&name).await {
            Ok(image) => image,
            Err(e) => {
                warn!("Image lookup for {} failed: {}", name, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WikipediaConfig;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline(server: &MockServer) -> HappenedTodayPipeline {
        let config = WikipediaConfig {
            api_url_template: format!("{}/{{lang}}/w/api.php", server.uri()),
            sparql_endpoint: format!("{}/sparql", server.uri()),
            image_languages: vec!["en".to_string()],
            requests_per_second: 1000.0,
            ..Default::default()
        };
        HappenedTodayPipeline::new(
            WikidataClient::new(&config).unwrap(),
            WikipediaClient::new(&config).unwrap(),
            vec!["mangaka".to_string()],
        )
    }

    #[test]
    fn test_deaths_prompt() {
        let records = vec![DeathRecord {
            name: "Osamu Tezuka".to_string(),
            description: Some("Japanese manga artist".to_string()),
            award: None,
            date_of_death: Some("1989-02-09T00:00:00Z".to_string()),
        }];
        let prompt = deaths_prompt(&records);
        assert!(prompt.contains(
            "- Osamu Tezuka (1989-02-09T00:00:00Z): Japanese manga artist. Award received: none\n"
        ));
        assert!(prompt.ends_with("generate a long and detailed description for him.\n"));
    }

    #[test]
    fn test_featured_name() {
        let text = "#AccaddeOggi 09 Feb 📅\n\n**Osamu Tezuka**\n\nNato il 3 novembre 1928";
        assert_eq!(featured_name(text).as_deref(), Some("Osamu Tezuka"));
        assert_eq!(featured_name("nessun nome"), None);
    }

    #[tokio::test]
    async fn test_validate_length() {
        let server = MockServer::start().await;
        let pipeline = pipeline(&server);
        assert!(pipeline.validate("troppo corto").is_err());
        assert!(pipeline.validate(&"Osamu Tezuka ".repeat(5)).is_ok());
    }

    #[tokio::test]
    async fn test_no_deaths_means_nothing_to_do() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": {"bindings": []}
            })))
            .mount(&server)
            .await;
        assert!(pipeline(&server).prepare(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_illustrate_without_images_posts_text_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("prop", "images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {"pages": {"1": {"pageid": 1, "title": "Osamu Tezuka", "images": []}}}
            })))
            .mount(&server)
            .await;

        let pipeline = pipeline(&server);
        let prepared = Prepared::new(GenerationRequest::text("s", "p"));
        let image = pipeline
            .illustrate(&prepared, "**Osamu Tezuka**\n\ntesto")
            .await;
        assert!(image.is_none());
    }
}
