//! Logging and progress helpers
//!
//! Log lines go to stderr through the shared [`MultiProgress`] so progress
//! bars stay pinned, and optionally to a size-rotated file under the log
//! directory. Both writers replace known secret values before anything is
//! written.

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

pub const LOG_FILE_NAME: &str = "agentparl.log";

const MASK: &str = "***";

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

pub fn add_progress_bar(len: u64) -> ProgressBar {
    multi_progress().add(ProgressBar::new(len))
}

fn print_line(line: &str) {
    let mp = multi_progress();
    if mp.is_hidden() {
        // Not a terminal (cron, pipes): indicatif would drop the line
        let _ = writeln!(io::stderr(), "{}", line);
    } else {
        let _ = mp.println(line);
    }
}

/// Replaces secret values with `***`
#[derive(Debug, Clone, Default)]
pub struct SecretMask {
    secrets: Arc<Vec<String>>,
}

impl SecretMask {
    pub fn new(values: Vec<String>) -> Self {
        let mut secrets: Vec<String> = values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        // Longest first so a secret containing another is fully masked
        secrets.sort_by(|a, b| b.len().cmp(&a.len()));
        secrets.dedup();
        Self {
            secrets: Arc::new(secrets),
        }
    }

    pub fn apply(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for secret in self.secrets.iter() {
            if masked.contains(secret.as_str()) {
                masked = masked.replace(secret.as_str(), MASK);
            }
        }
        masked
    }
}

/// Stderr writer factory
#[derive(Default, Clone)]
pub struct LogWriterFactory {
    mask: SecretMask,
}

impl LogWriterFactory {
    pub fn new(mask: SecretMask) -> Self {
        Self { mask }
    }
}

pub struct LogWriter {
    buffer: String,
    mask: SecretMask,
}

impl LogWriter {
    fn new(mask: SecretMask) -> Self {
        Self {
            buffer: String::new(),
            mask,
        }
    }

    fn emit(&self, line: &str) {
        print_line(&self.mask.apply(line));
    }

    fn flush_buffer(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let line = self.buffer.trim_end_matches('\n').trim_end_matches('\r').to_string();
        self.emit(&line);
        self.buffer.clear();
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let chunk = String::from_utf8_lossy(buf);
        self.buffer.push_str(&chunk);

        while let Some(idx) = self.buffer.find('\n') {
            let line = self.buffer[..idx].trim_end_matches('\r').to_string();
            self.emit(&line);
            self.buffer.drain(..idx + 1);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer();
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter::new(self.mask.clone())
    }
}

struct RotationState {
    path: PathBuf,
    max_bytes: u64,
    max_files: usize,
    file: File,
    written: u64,
}

impl RotationState {
    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    /// `agentparl.log` -> `.1` -> `.2` ... up to `max_files` backups
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let oldest = self.backup_path(self.max_files);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }
        for index in (1..self.max_files).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                std::fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        std::fs::rename(&self.path, self.backup_path(1))?;
        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }

    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.written > 0 && self.written + bytes.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Log file that rolls over once it would grow past `max_bytes`
#[derive(Clone)]
pub struct RotatingFile {
    state: Arc<Mutex<RotationState>>,
    mask: SecretMask,
}

impl RotatingFile {
    pub fn open(path: &Path, max_bytes: u64, max_files: usize, mask: SecretMask) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = open_append(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            state: Arc::new(Mutex::new(RotationState {
                path: path.to_path_buf(),
                max_bytes: max_bytes.max(1),
                max_files: max_files.max(1),
                file,
                written,
            })),
            mask,
        })
    }

    fn append(&self, text: &str) -> io::Result<()> {
        let masked = self.mask.apply(text);
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        state.append(masked.as_bytes())
    }
}

/// Buffers one formatted event and appends it on drop
pub struct FileWriter {
    target: RotatingFile,
    buffer: Vec<u8>,
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        self.target.append(&text)
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = FileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        FileWriter {
            target: self.clone(),
            buffer: Vec::new(),
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over everything; otherwise `--verbose` means debug and
/// the configured level applies.
pub fn init_logging(
    config: &LoggingConfig,
    log_dir: &Path,
    verbose: bool,
    secrets: Vec<String>,
) -> Result<()> {
    let default_level = if verbose { "debug" } else { config.level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let mask = if config.mask_secrets {
        SecretMask::new(secrets)
    } else {
        SecretMask::default()
    };

    let file_layer = if config.to_file {
        let file = RotatingFile::open(
            &log_dir.join(LOG_FILE_NAME),
            config.max_file_bytes,
            config.max_files,
            mask.clone(),
        )?;
        let layer = if config.json {
            fmt::layer().json().with_ansi(false).with_writer(file).boxed()
        } else {
            fmt::layer().with_ansi(false).with_writer(file).boxed()
        };
        Some(layer)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(fmt::layer().with_writer(LogWriterFactory::new(mask)))
        .with(filter)
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to initialize logging: {}", e)))
}
