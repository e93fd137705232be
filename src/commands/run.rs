//! Pipeline subcommands

use crate::config::Config;
use crate::error::Result;
use crate::generate::{ContentGenerator, GeminiClient};
use crate::orchestrator::{Orchestrator, Pipeline, RunOutcome};
use crate::pipelines::PipelineKind;
use crate::publish::{Publisher, TelegramClient};
use crate::store::{ContentStore, ItemStore};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pipeline: String,
    pub published: bool,
    pub tracked: Vec<i64>,
    pub message_ids: Vec<i64>,
}

impl RunReport {
    fn new(pipeline: &str, outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::NothingToDo => Self {
                pipeline: pipeline.to_string(),
                published: false,
                tracked: Vec::new(),
                message_ids: Vec::new(),
            },
            RunOutcome::Published { tracked, message_ids } => Self {
                pipeline: pipeline.to_string(),
                published: true,
                tracked,
                message_ids,
            },
        }
    }
}

/// Build the pipeline and its collaborators from configuration, then run it once
pub async fn cmd_run(config: &Config, kind: PipelineKind) -> Result<RunReport> {
    let pipeline = kind.build(config)?;
    let chat_id = config.telegram_channel_id()?;
    let generator = GeminiClient::from_config(config)?
        .with_grounding(config.llm.grounding || pipeline.needs_search());
    let publisher = TelegramClient::from_config(config)?;

    run_pipeline(config, pipeline.as_ref(), &generator, &publisher, &chat_id).await
}

/// Run one pipeline with the given collaborators.
///
/// The pipeline's store is opened for this run only and closed on every path.
pub async fn run_pipeline(
    config: &Config,
    pipeline: &dyn Pipeline,
    generator: &dyn ContentGenerator,
    publisher: &dyn Publisher,
    chat_id: &str,
) -> Result<RunReport> {
    let store = match pipeline.store_kind() {
        Some(kind) => {
            debug!("Opening {} store at {:?}", kind, config.store_path(kind));
            Some(ContentStore::open_kind(config, kind).await?)
        }
        None => None,
    };

    let orchestrator =
        Orchestrator::new(generator, publisher, chat_id, config.llm.validation_attempts);
    let outcome = orchestrator
        .run_once(pipeline, store.as_ref().map(|s| s as &dyn ItemStore))
        .await;

    if let Some(store) = &store {
        store.close().await;
    }
    Ok(RunReport::new(pipeline.name(), outcome?))
}

pub fn print_run_report(report: &RunReport) {
    if !report.published {
        println!("Nothing to post for {}.", report.pipeline);
        return;
    }
    println!(
        "✓ {} published (message {:?})",
        report.pipeline, report.message_ids
    );
    if !report.tracked.is_empty() {
        println!("  Marked posted: {:?}", report.tracked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuoteConfig;
    use crate::orchestrator::testing::{RecordingPublisher, ScriptedGenerator};
    use crate::pipelines::QuotePipeline;
    use crate::store::{ContentType, NewItem, StoreKind};
    use serde_json::json;
    use tempfile::TempDir;

    fn config(tmp: &TempDir) -> Config {
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config
    }

    #[tokio::test]
    async fn test_empty_store_is_nothing_to_do() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        let pipeline = QuotePipeline::new("quote", &QuoteConfig::default());
        let generator = ScriptedGenerator::replying("#QuoteOfTheDay");
        let publisher = RecordingPublisher::ok();

        let report = run_pipeline(&config, &pipeline, &generator, &publisher, "@chan")
            .await
            .unwrap();
        assert!(!report.published);
        assert_eq!(generator.calls(), 0);
        assert!(publisher.sent().is_empty());
        assert!(config.store_path(StoreKind::Quotes).exists());
    }

    #[tokio::test]
    async fn test_published_quote_is_recorded() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        let store = ContentStore::open_kind(&config, StoreKind::Quotes).await.unwrap();
        store
            .insert(
                &NewItem::new("Carpe diem", ContentType::Quote, "import")
                    .with_metadata(json!({"author": "Orazio"})),
            )
            .await
            .unwrap();
        store.close().await;

        let pipeline = QuotePipeline::new("quote", &QuoteConfig::default());
        let generator =
            ScriptedGenerator::replying("#QuoteOfTheDay #latino\n\n***Cogli l'attimo***");
        let publisher = RecordingPublisher::ok();

        let report = run_pipeline(&config, &pipeline, &generator, &publisher, "@chan")
            .await
            .unwrap();
        assert!(report.published);
        assert_eq!(report.tracked.len(), 1);
        assert_eq!(publisher.sent()[0].chat_id, "@chan");

        let store = ContentStore::open_kind(&config, StoreKind::Quotes).await.unwrap();
        let row = store.get(report.tracked[0]).await.unwrap().unwrap();
        assert!(row.posted);
        store.close().await;
    }

    #[tokio::test]
    async fn test_missing_secrets_fail_before_any_work() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(&tmp);
        config.telegram.channel_id_env = "AGENTPARL_TEST_UNSET_CHANNEL".to_string();

        let err = cmd_run(&config, PipelineKind::Quote).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
        assert!(!config.store_path(StoreKind::Quotes).exists());
    }
}
