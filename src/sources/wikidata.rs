//! Wikidata SPARQL connector: people of given professions who died on
//! today's day and month

use super::{check_status, http_client, RequestLimiter};
use crate::config::WikipediaConfig;
use crate::error::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, warn};

const SOURCE: &str = "wikidata";

/// Wikidata item for a profession name, or the input itself if it is
/// already an item id (`Q191633` or `wd:Q191633`)
pub fn profession_qid(name: &str) -> Option<String> {
    let known = match name.trim().to_lowercase().as_str() {
        "comics artist" => Some("Q266569"),
        "cartoonist" => Some("Q5434338"),
        "mangaka" => Some("Q191633"),
        "fantasy writer" => Some("Q1114448"),
        "animator" => Some("Q715301"),
        _ => None,
    };
    if let Some(qid) = known {
        return Some(qid.to_string());
    }

    let raw = name.trim().trim_start_matches("wd:");
    let is_qid = raw.len() > 1
        && raw.starts_with('Q')
        && raw[1..].chars().all(|c| c.is_ascii_digit());
    is_qid.then(|| raw.to_string())
}

/// SPARQL for humans with profession `qid` whose date of death falls on
/// the current day and month
pub fn deaths_on_this_day_query(qid: &str) -> String {
    format!(
        "SELECT ?person ?personLabel ?personDescription ?awardLabel ?date_of_death WHERE {{ \
         ?person wdt:P31 wd:Q5; wdt:P106 wd:{qid}. \
         SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"[AUTO_LANGUAGE],mul,en\". }} \
         OPTIONAL {{ ?person wdt:P570 ?date_of_death. }} \
         OPTIONAL {{ ?person wdt:P166 ?award. }} \
         FILTER((DAY(?date_of_death) = DAY(NOW())) && (MONTH(?date_of_death) = MONTH(NOW()))) \
         }} ORDER BY DESC(?date_of_death)",
        qid = qid
    )
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

/// A person who died on today's date in some year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeathRecord {
    pub name: String,
    pub description: Option<String>,
    pub award: Option<String>,
    pub date_of_death: Option<String>,
}

fn binding(row: &HashMap<String, SparqlValue>, key: &str) -> Option<String> {
    row.get(key)
        .map(|v| v.value.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Wikidata Query Service client
pub struct WikidataClient {
    client: Client,
    endpoint: String,
    limiter: RequestLimiter,
}

impl WikidataClient {
    pub fn new(config: &WikipediaConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(&config.user_agent, Duration::from_secs(config.timeout_secs))?,
            endpoint: config.sparql_endpoint.clone(),
            limiter: RequestLimiter::new(config.requests_per_second),
        })
    }

    pub fn with_limiter(mut self, limiter: RequestLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    async fn query(&self, sparql: &str) -> Result<Vec<HashMap<String, SparqlValue>>> {
        self.limiter.wait().await;
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", sparql), ("format", "json")])
            .header("Accept", "application/sparql-results+json")
            .send()
            .await?;
        let response = check_status(SOURCE, response).await?;
        let parsed: SparqlResponse = response.json().await?;
        Ok(parsed.results.bindings)
    }

    /// People of the given professions who died on this day, keyed by name.
    ///
    /// A person listed under several professions or awards appears once,
    /// with the first award seen.
    pub async fn deaths_on_this_day(&self, professions: &[String]) -> Result<Vec<DeathRecord>> {
        let mut people: BTreeMap<String, DeathRecord> = BTreeMap::new();

        for profession in professions {
            let Some(qid) = profession_qid(profession) else {
                warn!("Unknown profession '{}', skipping", profession);
                continue;
            };
            let rows = self.query(&deaths_on_this_day_query(&qid)).await?;
            debug!("{} rows for profession {} ({})", rows.len(), profession, qid);

            for row in rows {
                let Some(name) = binding(&row, "personLabel") else {
                    continue;
                };
                // Unlabelled items come back as their bare id
                if profession_qid(&name).is_some() {
                    continue;
                }
                people.entry(name.clone()).or_insert_with(|| DeathRecord {
                    name,
                    description: binding(&row, "personDescription"),
                    award: binding(&row, "awardLabel"),
                    date_of_death: binding(&row, "date_of_death"),
                });
            }
        }

        info!("Found {} people who died on this day", people.len());
        Ok(people.into_values().collect())
    }
}
