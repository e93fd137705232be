//! Nerd curiosities: facts from a random Wikipedia article in a nerd
//! category
//!
//! Each run first tries to discover a new article and store it as a
//! candidate, then posts a random unposted article from the store. A run
//! whose discovery fails can still post an article found earlier.

use super::{require_hashtag, truncate_chars};
use crate::config::CuriosityConfig;
use crate::error::{Error, Result};
use crate::generate::GenerationRequest;
use crate::orchestrator::{Pipeline, Prepared};
use crate::sources::WikipediaClient;
use crate::store::{CategoryFilter, ContentType, InsertOutcome, ItemStore, NewItem, StoreKind};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::json;
use tracing::{debug, info, warn};

pub const CURIOSITY_SOURCE_MODULE: &str = "nerd_curiosities";

const SYSTEM_INSTRUCTION: &str = "\
Sei un assistente AI specializzato nella creazione di contenuti coinvolgenti per i social media in ITALIANO su argomenti della cultura nerd, inclusi anime, manga, fumetti, videogiochi, fantascienza, fantasy e cultura pop.

Il tuo compito è analizzare un articolo di Wikipedia ed estrarre 2-3 fatti sorprendenti, interessanti o poco conosciuti che affascinerebbero gli appassionati di cultura nerd.

Formatta la tua risposta come un messaggio Telegram pronto per la pubblicazione con:
- Un titolo accattivante con emoji pertinenti
- 2-3 punti elenco con fatti interessanti (BREVI)
- 3-5 hashtag rilevanti
- Tono conversazionale e coinvolgente
- IMPORTANTE: Lunghezza totale MASSIMO {max} caratteri (inclusi spazi e hashtag)

Non usare **grassetto** o _corsivo_. Usa le emoji per i punti elenco.

Mantieni i fatti concisi e impattanti. Non includere altro testo o spiegazioni al di fuori del post formattato.
Concentrati su curiosità che potrebbero sorprendere anche i fan più esperti dell'argomento.";

/// Common Italian words and accented letters; one hit is enough
const ITALIAN_MARKERS: [&str; 12] = [
    "è", "à", "ì", "ò", "ù", "che", "del", "della", "di", "da", "con", "per",
];

fn looks_italian(text: &str) -> bool {
    let lower = text.to_lowercase();
    if ["è", "à", "ì", "ò", "ù"].iter().any(|c| lower.contains(c)) {
        return true;
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| ITALIAN_MARKERS.contains(&word))
}

pub struct CuriosityPipeline {
    wiki: WikipediaClient,
    settings: CuriosityConfig,
}

impl CuriosityPipeline {
    pub fn new(wiki: WikipediaClient, settings: CuriosityConfig) -> Self {
        Self { wiki, settings }
    }

    /// Store one new article as a candidate; errors only cost this run's discovery
    async fn discover(&self, store: &dyn ItemStore) {
        for attempt in 1..=self.settings.discovery_attempts {
            let picked = self.settings.categories.choose(&mut rand::thread_rng()).cloned();
            let Some(category) = picked else {
                return;
            };
            debug!(
                "Discovery attempt {}/{} in category {}",
                attempt, self.settings.discovery_attempts, category
            );

            let article = match self
                .wiki
                .random_article_from_category(
                    &category,
                    &self.settings.lang,
                    self.settings.min_article_chars,
                    10,
                )
                .await
            {
                Ok(Some(article)) => article,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Discovery in {} failed: {}", category, e);
                    continue;
                }
            };

            let item = NewItem::new(&article.title, ContentType::Article, CURIOSITY_SOURCE_MODULE)
                .with_url(&article.url)
                .with_category(&category)
                .with_metadata(json!({
                    "page_id": article.page_id,
                    "lang": self.settings.lang,
                }));
            match store.insert(&item).await {
                Ok(InsertOutcome::Inserted(id)) => {
                    info!("Stored new article '{}' as candidate {}", article.title, id);
                    return;
                }
                Ok(InsertOutcome::Duplicate) => {
                    debug!("Article '{}' already known", article.title);
                }
                Err(e) => warn!("Could not store article '{}': {}", article.title, e),
            }
        }
        warn!(
            "No new article found after {} attempts",
            self.settings.discovery_attempts
        );
    }
}

pub(crate) fn curiosity_prompt(
    title: &str,
    url: &str,
    summary: &str,
    content: &str,
    max_chars: usize,
) -> String {
    format!(
        "Titolo Articolo: {}\nURL Articolo: {}\nRiassunto Articolo: {}\nContenuto Articolo: {}\n\n\
         Estrai le curiosità più interessanti e formattale come un post italiano per i social media.",
        title,
        url,
        summary,
        truncate_chars(content, max_chars)
    )
}

#[async_trait]
impl Pipeline for CuriosityPipeline {
    fn name(&self) -> &str {
        "curiosity"
    }

    fn store_kind(&self) -> Option<StoreKind> {
        Some(StoreKind::Articles)
    }

    async fn prepare(&self, store: Option<&dyn ItemStore>) -> Result<Option<Prepared>> {
        let Some(store) = store else {
            return Ok(None);
        };
        self.discover(store).await;

        let Some(candidate) = store
            .select_random_unposted(Some(ContentType::Article), &CategoryFilter::Any)
            .await
        else {
            return Ok(None);
        };
        let lang = candidate
            .meta_str("lang")
            .unwrap_or(&self.settings.lang)
            .to_string();

        let article = self
            .wiki
            .article_content(&candidate.title, &lang)
            .await?
            .ok_or_else(|| {
                Error::connector(
                    "wikipedia",
                    format!("article '{}' is no longer available", candidate.title),
                )
            })?;
        info!(
            "Writing about '{}' ({} characters)",
            article.title,
            article.content.chars().count()
        );

        let prompt = curiosity_prompt(
            &article.title,
            &article.url,
            &article.summary,
            &article.content,
            self.settings.prompt_content_chars,
        );
        let system = SYSTEM_INSTRUCTION.replace("{max}", &self.settings.post_max_chars.to_string());
        Ok(Some(
            Prepared::new(GenerationRequest::text(system, prompt)).tracking(vec![candidate.id]),
        ))
    }

    fn validate(&self, text: &str) -> std::result::Result<(), String> {
        let length = text.trim().chars().count();
        if length < self.settings.post_min_chars {
            return Err(format!(
                "too short: {} characters (min {})",
                length, self.settings.post_min_chars
            ));
        }
        if length > self.settings.post_max_chars {
            return Err(format!(
                "too long: {} characters (max {})",
                length, self.settings.post_max_chars
            ));
        }
        if !looks_italian(text) {
            return Err("text does not look Italian".to_string());
        }
        require_hashtag(text)
    }
}
