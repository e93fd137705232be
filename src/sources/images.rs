//! Local image folder: `<data_dir>/images/pending` holds images waiting
//! to be posted, `<data_dir>/images/posted` receives them afterwards.

use crate::config::Config;
use crate::error::Result;
use crate::media::ImageData;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub modified: SystemTime,
}

pub struct ImageFolder {
    pending: PathBuf,
    posted: PathBuf,
    extensions: Vec<String>,
    max_bytes: u64,
}

impl ImageFolder {
    pub fn new(pending: PathBuf, posted: PathBuf, extensions: &[String], max_bytes: u64) -> Self {
        Self {
            pending,
            posted,
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            max_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let settings = &config.pipelines.post_image;
        Self::new(
            config.paths.images_pending_dir(),
            config.paths.images_posted_dir(),
            &settings.extensions,
            settings.max_image_bytes,
        )
    }

    pub fn pending_dir(&self) -> &Path {
        &self.pending
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.pending)?;
        std::fs::create_dir_all(&self.posted)?;
        Ok(())
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| self.extensions.contains(&e))
    }

    /// Postable images in the pending folder, oldest first.
    ///
    /// Files over the size limit or with other extensions are skipped.
    pub fn pending_images(&self) -> Result<Vec<PendingImage>> {
        if !self.pending.exists() {
            debug!("Pending folder {:?} does not exist", self.pending);
            return Ok(Vec::new());
        }

        let mut images = Vec::new();
        for entry in WalkDir::new(&self.pending).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot read pending entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.has_allowed_extension(entry.path()) {
                continue;
            }

            let metadata = entry.metadata().map_err(std::io::Error::from)?;
            if metadata.len() > self.max_bytes {
                warn!(
                    "Skipping {:?}: {} bytes exceeds the {} byte limit",
                    entry.path(),
                    metadata.len(),
                    self.max_bytes
                );
                continue;
            }

            images.push(PendingImage {
                path: entry.path().to_path_buf(),
                file_name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        images.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(images)
    }

    pub fn load(&self, image: &PendingImage) -> Result<ImageData> {
        ImageData::from_path(&image.path)
    }

    /// Move a posted image out of the pending folder. An existing file of
    /// the same name in `posted/` is never overwritten.
    pub fn archive(&self, path: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.posted)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let mut target = self.posted.join(&file_name);
        let mut counter = 1;
        while target.exists() {
            target = self.posted.join(format!("{}-{}", counter, file_name));
            counter += 1;
        }

        if std::fs::rename(path, &target).is_err() {
            // Different filesystem
            std::fs::copy(path, &target)?;
            std::fs::remove_file(path)?;
        }
        info!("Moved {:?} to {:?}", path, target);
        Ok(target)
    }
}
