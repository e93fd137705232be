//! Runs one pipeline through select → generate → publish → record.
//!
//! The store is only written after the publisher confirms delivery, and
//! only for the ids the pipeline asked to track. If the message went out
//! but recording fails, the run ends with
//! [`Error::PublishedButNotRecorded`] instead of pretending nothing
//! happened.

use crate::error::{Error, Result, RunStage};
use crate::generate::{ContentGenerator, GenerationRequest};
use crate::media::ImageData;
use crate::publish::{OutgoingMessage, ParseMode, Publisher};
use crate::store::{ItemStore, StoreKind};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// What a pipeline hands to the orchestrator after selection
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Store ids to mark posted after a successful publish
    pub tracked_ids: Vec<i64>,
    pub request: GenerationRequest,
    /// Image to send with the text
    pub image: Option<ImageData>,
    pub parse_mode: ParseMode,
    /// Local file backing the candidate, for post-publish housekeeping
    pub local_file: Option<PathBuf>,
}

impl Prepared {
    pub fn new(request: GenerationRequest) -> Self {
        Self {
            tracked_ids: Vec::new(),
            request,
            image: None,
            parse_mode: ParseMode::Markdown,
            local_file: None,
        }
    }

    pub fn tracking(mut self, ids: Vec<i64>) -> Self {
        self.tracked_ids = ids;
        self
    }

    pub fn with_image(mut self, image: ImageData) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    pub fn with_local_file(mut self, path: PathBuf) -> Self {
        self.local_file = Some(path);
        self
    }
}

/// One content type's selection and prompt logic
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Name used in logs and as the subcommand
    fn name(&self) -> &str;

    /// Store this pipeline reads and records in; `None` for stateless pipelines
    fn store_kind(&self) -> Option<StoreKind>;

    /// Whether the generator should ground its answer in web search
    fn needs_search(&self) -> bool {
        false
    }

    /// Pick a candidate and build the generation request.
    /// `Ok(None)` means there is nothing to post.
    async fn prepare(&self, store: Option<&dyn ItemStore>) -> Result<Option<Prepared>>;

    /// Reject generated text that should be regenerated
    fn validate(&self, _text: &str) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Find an image for the generated text when selection did not provide one
    async fn illustrate(&self, _prepared: &Prepared, _text: &str) -> Option<ImageData> {
        None
    }

    /// Housekeeping once the message is live
    async fn finish(&self, _prepared: &Prepared) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NothingToDo,
    Published {
        tracked: Vec<i64>,
        message_ids: Vec<i64>,
    },
}

fn stage_failed(stage: RunStage, source: Error) -> Error {
    Error::StageFailed {
        stage,
        source: Box::new(source),
    }
}

pub struct Orchestrator<'a> {
    generator: &'a dyn ContentGenerator,
    publisher: &'a dyn Publisher,
    chat_id: String,
    validation_attempts: u32,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        generator: &'a dyn ContentGenerator,
        publisher: &'a dyn Publisher,
        chat_id: impl Into<String>,
        validation_attempts: u32,
    ) -> Self {
        Self {
            generator,
            publisher,
            chat_id: chat_id.into(),
            validation_attempts: validation_attempts.max(1),
        }
    }

    fn enter(&self, pipeline: &dyn Pipeline, stage: RunStage) {
        info!("[{}] {}", pipeline.name(), stage);
    }

    async fn generate(
        &self,
        pipeline: &dyn Pipeline,
        request: &GenerationRequest,
    ) -> Result<String> {
        let mut last_problem = String::new();
        for attempt in 1..=self.validation_attempts {
            let text = self.generator.generate(request).await?;
            match pipeline.validate(&text) {
                Ok(()) => return Ok(text),
                Err(problem) => {
                    warn!(
                        "[{}] generated text rejected (attempt {}/{}): {}",
                        pipeline.name(),
                        attempt,
                        self.validation_attempts,
                        problem
                    );
                    last_problem = problem;
                }
            }
        }
        Err(Error::GenerationFailed(format!(
            "no acceptable text after {} attempts: {}",
            self.validation_attempts, last_problem
        )))
    }

    async fn record(
        &self,
        store: &dyn ItemStore,
        ids: &[i64],
    ) -> std::result::Result<(), (Vec<i64>, String)> {
        let mut unrecorded = Vec::new();
        let mut reasons = Vec::new();
        for &id in ids {
            match store.mark_posted(id).await {
                Ok(true) => {}
                Ok(false) => {
                    unrecorded.push(id);
                    reasons.push(format!("item {} missing or already posted", id));
                }
                Err(e) => {
                    unrecorded.push(id);
                    reasons.push(format!("item {}: {}", id, e));
                }
            }
        }
        if unrecorded.is_empty() {
            Ok(())
        } else {
            Err((unrecorded, reasons.join("; ")))
        }
    }

    /// Run the pipeline once
    pub async fn run_once(
        &self,
        pipeline: &dyn Pipeline,
        store: Option<&dyn ItemStore>,
    ) -> Result<RunOutcome> {
        self.enter(pipeline, RunStage::Selecting);
        let prepared = match pipeline.prepare(store).await {
            Ok(Some(prepared)) => prepared,
            Ok(None) => {
                info!("[{}] nothing to post", pipeline.name());
                self.enter(pipeline, RunStage::Done);
                return Ok(RunOutcome::NothingToDo);
            }
            Err(e) => return Err(stage_failed(RunStage::Selecting, e)),
        };
        if !prepared.tracked_ids.is_empty() && store.is_none() {
            return Err(stage_failed(
                RunStage::Selecting,
                Error::Other("pipeline tracks items but no store is open".to_string()),
            ));
        }

        self.enter(pipeline, RunStage::Generating);
        let text = self
            .generate(pipeline, &prepared.request)
            .await
            .map_err(|e| stage_failed(RunStage::Generating, e))?;
        info!(
            "[{}] generated {} characters with {}",
            pipeline.name(),
            text.chars().count(),
            self.generator.model_name()
        );

        let image = match &prepared.image {
            Some(image) => Some(image.clone()),
            None => pipeline.illustrate(&prepared, &text).await,
        };

        self.enter(pipeline, RunStage::Publishing);
        let message = OutgoingMessage {
            chat_id: self.chat_id.clone(),
            text,
            image,
            parse_mode: prepared.parse_mode,
        };
        let ack = self
            .publisher
            .publish(&message)
            .await
            .map_err(|e| stage_failed(RunStage::Publishing, e))?;
        if !ack.ok {
            return Err(stage_failed(
                RunStage::Publishing,
                Error::PublishFailed(
                    ack.description
                        .unwrap_or_else(|| "channel did not acknowledge the message".to_string()),
                ),
            ));
        }

        self.enter(pipeline, RunStage::Recording);
        let recorded = match store {
            Some(store) if !prepared.tracked_ids.is_empty() => {
                self.record(store, &prepared.tracked_ids).await
            }
            _ => Ok(()),
        };

        if let Err(e) = pipeline.finish(&prepared).await {
            warn!("[{}] post-publish housekeeping failed: {}", pipeline.name(), e);
        }

        if let Err((ids, reason)) = recorded {
            error!(
                "ALERT [{}] message {:?} is live but items {:?} were not marked posted: {}",
                pipeline.name(),
                ack.message_ids,
                ids,
                reason
            );
            return Err(Error::PublishedButNotRecorded { ids, reason });
        }

        self.enter(pipeline, RunStage::Done);
        Ok(RunOutcome::Published {
            tracked: prepared.tracked_ids,
            message_ids: ack.message_ids,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::store::{
        CategoryFilter, ContentItem, ContentStore, ContentType, InsertOutcome, NewItem,
    };
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Picks one random unposted quote; wants a hashtag in the output
    struct QuotePick {
        finished: Mutex<u32>,
    }

    impl QuotePick {
        fn new() -> Self {
            Self {
                finished: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Pipeline for QuotePick {
        fn name(&self) -> &str {
            "quote-pick"
        }

        fn store_kind(&self) -> Option<StoreKind> {
            Some(StoreKind::Quotes)
        }

        async fn prepare(&self, store: Option<&dyn ItemStore>) -> Result<Option<Prepared>> {
            let Some(store) = store else {
                return Ok(None);
            };
            let Some(item) = store
                .select_random_unposted(Some(ContentType::Quote), &CategoryFilter::Any)
                .await
            else {
                return Ok(None);
            };
            Ok(Some(
                Prepared::new(GenerationRequest::text("hashtags please", item.title.clone()))
                    .tracking(vec![item.id]),
            ))
        }

        fn validate(&self, text: &str) -> std::result::Result<(), String> {
            if text.contains('#') {
                Ok(())
            } else {
                Err("missing hashtag".to_string())
            }
        }

        async fn finish(&self, _prepared: &Prepared) -> Result<()> {
            *self.finished.lock().unwrap() += 1;
            Ok(())
        }
    }

    /// Stateless pipeline that illustrates its output
    struct Illustrated;

    #[async_trait]
    impl Pipeline for Illustrated {
        fn name(&self) -> &str {
            "illustrated"
        }

        fn store_kind(&self) -> Option<StoreKind> {
            None
        }

        async fn prepare(&self, _store: Option<&dyn ItemStore>) -> Result<Option<Prepared>> {
            Ok(Some(Prepared::new(GenerationRequest::text("sys", "who died today?"))))
        }

        async fn illustrate(&self, _prepared: &Prepared, text: &str) -> Option<ImageData> {
            text.contains("**Tezuka**")
                .then(|| ImageData::new(vec![1, 2, 3], "image/jpeg", "tezuka.jpg"))
        }
    }

    /// Store whose writes always fail after selection succeeds
    struct BrokenRecorder {
        inner: ContentStore,
    }

    #[async_trait]
    impl ItemStore for BrokenRecorder {
        async fn insert(&self, item: &NewItem) -> Result<InsertOutcome> {
            self.inner.insert(item).await
        }

        async fn find(
            &self,
            title: &str,
            content_type: ContentType,
            source_module: &str,
        ) -> Result<Option<ContentItem>> {
            self.inner.find(title, content_type, source_module).await
        }

        async fn select_random_unposted(
            &self,
            content_type: Option<ContentType>,
            filter: &CategoryFilter,
        ) -> Option<ContentItem> {
            self.inner.select_random_unposted(content_type, filter).await
        }

        async fn select_unposted_batch(
            &self,
            content_type: Option<ContentType>,
            filter: &CategoryFilter,
            limit: u32,
        ) -> Vec<ContentItem> {
            self.inner.select_unposted_batch(content_type, filter, limit).await
        }

        async fn mark_posted(&self, _id: i64) -> Result<bool> {
            Err(Error::Database(sqlx::Error::PoolClosed))
        }
    }

    async fn store_with_quote(tmp: &TempDir) -> (ContentStore, i64) {
        let store = ContentStore::open(&tmp.path().join("quotes.db")).await.unwrap();
        let outcome = store
            .insert(&NewItem::new("Talk is cheap", ContentType::Quote, "import"))
            .await
            .unwrap();
        let InsertOutcome::Inserted(id) = outcome else {
            panic!("expected insert");
        };
        (store, id)
    }

    #[tokio::test]
    async fn test_empty_store_is_nothing_to_do() {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::open(&tmp.path().join("quotes.db")).await.unwrap();
        let generator = ScriptedGenerator::replying("x #y");
        let publisher = RecordingPublisher::ok();
        let orchestrator = Orchestrator::new(&generator, &publisher, "@chan", 3);

        let outcome = orchestrator.run_once(&QuotePick::new(), Some(&store)).await.unwrap();
        assert_eq!(outcome, RunOutcome::NothingToDo);
        assert_eq!(generator.calls(), 0);
        assert!(publisher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_publish_then_record() {
        let tmp = TempDir::new().unwrap();
        let (store, id) = store_with_quote(&tmp).await;
        let generator = ScriptedGenerator::replying("Parole #Codice");
        let publisher = RecordingPublisher::ok();
        let orchestrator = Orchestrator::new(&generator, &publisher, "@chan", 3);
        let pipeline = QuotePick::new();

        let outcome = orchestrator.run_once(&pipeline, Some(&store)).await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Published {
                tracked: vec![id],
                message_ids: vec![1]
            }
        );

        let sent = publisher.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, "@chan");
        assert_eq!(sent[0].text, "Parole #Codice");
        assert!(store.get(id).await.unwrap().unwrap().posted);
        assert_eq!(*pipeline.finished.lock().unwrap(), 1);

        // The only candidate is gone now
        let again = orchestrator.run_once(&pipeline, Some(&store)).await.unwrap();
        assert_eq!(again, RunOutcome::NothingToDo);
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_store_untouched() {
        let tmp = TempDir::new().unwrap();
        let (store, id) = store_with_quote(&tmp).await;
        let generator = ScriptedGenerator::replying("Parole #Codice");
        let publisher = RecordingPublisher::failing();
        let orchestrator = Orchestrator::new(&generator, &publisher, "@chan", 3);
        let pipeline = QuotePick::new();

        let err = orchestrator.run_once(&pipeline, Some(&store)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::StageFailed {
                stage: RunStage::Publishing,
                ..
            }
        ));
        assert_eq!(err.exit_code(), 1);
        let item = store.get(id).await.unwrap().unwrap();
        assert!(!item.posted);
        assert!(item.post_date.is_none());
        assert_eq!(*pipeline.finished.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unacknowledged_publish_is_failure() {
        let tmp = TempDir::new().unwrap();
        let (store, id) = store_with_quote(&tmp).await;
        let generator = ScriptedGenerator::replying("Parole #Codice");
        let publisher = RecordingPublisher::not_acknowledging();
        let orchestrator = Orchestrator::new(&generator, &publisher, "@chan", 3);

        let err = orchestrator
            .run_once(&QuotePick::new(), Some(&store))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bot is not a member"));
        assert!(!store.get(id).await.unwrap().unwrap().posted);
    }

    #[tokio::test]
    async fn test_recording_failure_is_alerted() {
        let tmp = TempDir::new().unwrap();
        let (inner, id) = store_with_quote(&tmp).await;
        let store = BrokenRecorder { inner };
        let generator = ScriptedGenerator::replying("Parole #Codice");
        let publisher = RecordingPublisher::ok();
        let orchestrator = Orchestrator::new(&generator, &publisher, "@chan", 3);
        let pipeline = QuotePick::new();

        let err = orchestrator.run_once(&pipeline, Some(&store)).await.unwrap_err();
        match &err {
            Error::PublishedButNotRecorded { ids, .. } => assert_eq!(ids, &vec![id]),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.exit_code(), 3);
        assert_eq!(publisher.sent().len(), 1);
        // Housekeeping still runs once the message is live
        assert_eq!(*pipeline.finished.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_output_is_regenerated() {
        let tmp = TempDir::new().unwrap();
        let (store, _) = store_with_quote(&tmp).await;
        let generator = ScriptedGenerator::new(vec![
            Ok("senza hashtag".to_string()),
            Ok("con #hashtag".to_string()),
        ]);
        let publisher = RecordingPublisher::ok();
        let orchestrator = Orchestrator::new(&generator, &publisher, "@chan", 3);

        orchestrator
            .run_once(&QuotePick::new(), Some(&store))
            .await
            .unwrap();
        assert_eq!(generator.calls(), 2);
        assert_eq!(publisher.sent()[0].text, "con #hashtag");
    }

    #[tokio::test]
    async fn test_validation_budget_exhausted() {
        let tmp = TempDir::new().unwrap();
        let (store, id) = store_with_quote(&tmp).await;
        let generator = ScriptedGenerator::replying("mai un hashtag");
        let publisher = RecordingPublisher::ok();
        let orchestrator = Orchestrator::new(&generator, &publisher, "@chan", 2);

        let err = orchestrator
            .run_once(&QuotePick::new(), Some(&store))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::StageFailed {
                stage: RunStage::Generating,
                ..
            }
        ));
        assert_eq!(generator.calls(), 2);
        assert!(publisher.sent().is_empty());
        assert!(!store.get(id).await.unwrap().unwrap().posted);
    }

    #[tokio::test]
    async fn test_generator_failure_skips_publish() {
        let tmp = TempDir::new().unwrap();
        let (store, _) = store_with_quote(&tmp).await;
        let generator =
            ScriptedGenerator::new(vec![Err(Error::GenerationFailed("quota".to_string()))]);
        let publisher = RecordingPublisher::ok();
        let orchestrator = Orchestrator::new(&generator, &publisher, "@chan", 3);

        let err = orchestrator
            .run_once(&QuotePick::new(), Some(&store))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("generating"));
        assert!(publisher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_illustration_is_attached() {
        let generator = ScriptedGenerator::replying("Oggi ricordiamo **Tezuka** #AccaddeOggi");
        let publisher = RecordingPublisher::ok();
        let orchestrator = Orchestrator::new(&generator, &publisher, "@chan", 1);

        let outcome = orchestrator.run_once(&Illustrated, None).await.unwrap();
        assert!(matches!(outcome, RunOutcome::Published { ref tracked, .. } if tracked.is_empty()));
        let sent = publisher.sent();
        assert_eq!(sent[0].image.as_ref().map(|i| i.file_name.as_str()), Some("tezuka.jpg"));
    }
}
