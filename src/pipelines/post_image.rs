//! Captioned posts for images dropped into the pending folder
//!
//! Images are tracked by content hash, so renaming or copying a file that
//! was already posted does not post it twice. The file is moved to the
//! posted folder once the message is live.

use crate::config::PostImageConfig;
use crate::error::Result;
use crate::generate::GenerationRequest;
use crate::orchestrator::{Pipeline, Prepared};
use crate::sources::ImageFolder;
use crate::store::{ContentType, InsertOutcome, ItemStore, NewItem, StoreKind};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

pub const IMAGE_SOURCE_MODULE: &str = "post_image";

const SYSTEM_INSTRUCTION: &str = "\
You are an AI assistant specialized in write caption for social media posts in ITALIAN.
Your task is to create a short & punchy caption for the given image and to provide relevant hashtags.
Keep the caption under {max} characters.
Do not include any other text or explanation.";

pub struct PostImagePipeline {
    folder: ImageFolder,
    settings: PostImageConfig,
}

impl PostImagePipeline {
    pub fn new(folder: ImageFolder, settings: PostImageConfig) -> Self {
        Self { folder, settings }
    }
}

#[async_trait]
impl Pipeline for PostImagePipeline {
    fn name(&self) -> &str {
        "post-image"
    }

    fn store_kind(&self) -> Option<StoreKind> {
        Some(StoreKind::Images)
    }

    async fn prepare(&self, store: Option<&dyn ItemStore>) -> Result<Option<Prepared>> {
        let Some(store) = store else {
            return Ok(None);
        };
        let pending = self.folder.pending_images()?;
        debug!("{} images pending", pending.len());

        for candidate in pending {
            let image = match self.folder.load(&candidate) {
                Ok(image) => image,
                Err(e) => {
                    warn!("Cannot read {:?}: {}", candidate.path, e);
                    continue;
                }
            };
            let hash = image.content_hash();
            let item = NewItem::new(&hash, ContentType::Image, IMAGE_SOURCE_MODULE)
                .with_metadata(json!({
                    "file_name": candidate.file_name,
                    "size": candidate.size,
                }));

            let id = match store.insert(&item).await? {
                InsertOutcome::Inserted(id) => id,
                InsertOutcome::Duplicate => {
                    let existing = store
                        .find(&hash, ContentType::Image, IMAGE_SOURCE_MODULE)
                        .await?;
                    let Some(existing) = existing else {
                        continue;
                    };
                    if existing.posted {
                        warn!(
                            "{} has already been posted (as {}), leaving it in place",
                            candidate.file_name,
                            existing.meta_str("file_name").unwrap_or("unknown file")
                        );
                        continue;
                    }
                    existing.id
                }
            };

            info!("Selected image {} ({} bytes)", candidate.file_name, candidate.size);
            let system =
                SYSTEM_INSTRUCTION.replace("{max}", &self.settings.caption_max_chars.to_string());
            let request = GenerationRequest::image(system, image.clone(), "Caption this image.");
            return Ok(Some(
                Prepared::new(request)
                    .tracking(vec![id])
                    .with_image(image)
                    .with_local_file(candidate.path),
            ));
        }
        Ok(None)
    }

    fn validate(&self, text: &str) -> std::result::Result<(), String> {
        let length = text.trim().chars().count();
        if length == 0 {
            return Err("empty caption".to_string());
        }
        if length > self.settings.caption_max_chars {
            return Err(format!(
                "caption too long: {} characters (max {})",
                length, self.settings.caption_max_chars
            ));
        }
        Ok(())
    }

    async fn finish(&self, prepared: &Prepared) -> Result<()> {
        if let Some(path) = &prepared.local_file {
            self.folder.archive(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::Part;
    use crate::store::ContentStore;
    use std::path::Path;
    use tempfile::TempDir;

    fn pipeline(tmp: &TempDir) -> PostImagePipeline {
        let folder = ImageFolder::new(
            tmp.path().join("pending"),
            tmp.path().join("posted"),
            &["jpg".to_string()],
            1024,
        );
        folder.ensure_dirs().unwrap();
        PostImagePipeline::new(folder, PostImageConfig::default())
    }

    fn pending(tmp: &TempDir, name: &str) -> std::path::PathBuf {
        tmp.path().join("pending").join(name)
    }

    async fn store(tmp: &TempDir) -> ContentStore {
        ContentStore::open(&tmp.path().join("images.db")).await.unwrap()
    }

    #[tokio::test]
    async fn test_prepare_registers_and_attaches_image() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp);
        let store = store(&tmp).await;
        std::fs::write(pending(&tmp, "cat.jpg"), b"meow").unwrap();

        let prepared = pipeline.prepare(Some(&store)).await.unwrap().unwrap();
        let image = prepared.image.clone().unwrap();
        assert_eq!(image.file_name, "cat.jpg");
        assert!(matches!(prepared.request.parts[0], Part::Image(_)));
        assert!(prepared.request.system_instruction.contains("under 300 characters"));
        assert_eq!(prepared.local_file.as_deref(), Some(pending(&tmp, "cat.jpg").as_path()));

        let stored = store
            .find(&image.content_hash(), ContentType::Image, IMAGE_SOURCE_MODULE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prepared.tracked_ids, vec![stored.id]);
        assert_eq!(stored.meta_str("file_name"), Some("cat.jpg"));

        // A second run before publishing picks the same row again
        let again = pipeline.prepare(Some(&store)).await.unwrap().unwrap();
        assert_eq!(again.tracked_ids, prepared.tracked_ids);
    }

    #[tokio::test]
    async fn test_posted_copy_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp);
        let store = store(&tmp).await;
        std::fs::write(pending(&tmp, "cat.jpg"), b"meow").unwrap();

        let prepared = pipeline.prepare(Some(&store)).await.unwrap().unwrap();
        assert!(store.mark_posted(prepared.tracked_ids[0]).await.unwrap());
        pipeline.finish(&prepared).await.unwrap();
        assert!(Path::new(&tmp.path().join("posted").join("cat.jpg")).exists());

        std::fs::write(pending(&tmp, "cat-copy.jpg"), b"meow").unwrap();
        assert!(pipeline.prepare(Some(&store)).await.unwrap().is_none());
        assert!(pending(&tmp, "cat-copy.jpg").exists());
    }

    #[tokio::test]
    async fn test_empty_folder() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp);
        let store = store(&tmp).await;
        assert!(pipeline.prepare(Some(&store)).await.unwrap().is_none());
    }

    #[test]
    fn test_validate_caption_length() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp);
        assert!(pipeline.validate("Che gatto! #gatti").is_ok());
        assert!(pipeline.validate("   ").is_err());
        assert!(pipeline.validate(&"a".repeat(301)).is_err());
    }
}
