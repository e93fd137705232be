//! Custom error types for agentparl

use std::fmt;
use thiserror::Error;

/// Stage of a pipeline run, used to tag failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    Selecting,
    Generating,
    Publishing,
    Recording,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Idle => "idle",
            RunStage::Selecting => "selecting",
            RunStage::Generating => "generating",
            RunStage::Publishing => "publishing",
            RunStage::Recording => "recording",
            RunStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Main error type for agentparl operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Feed parse error: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),

    /// A source connector returned something unusable
    #[error("Source error ({source_name}): {message}")]
    Source {
        source_name: String,
        message: String,
    },

    /// Retryable provider failure; only escapes a retry loop wrapped in a terminal variant
    #[error("Transient {provider} failure: {message}")]
    Transient { provider: String, message: String },

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Pipeline failed while {stage}: {source}")]
    StageFailed {
        stage: RunStage,
        #[source]
        source: Box<Error>,
    },

    /// The message is live on the channel but the store could not record it
    #[error("Published but not recorded (ids {ids:?}): {reason}")]
    PublishedButNotRecorded { ids: Vec<i64>, reason: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transient {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn connector(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Source {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether a retry loop may try again after this error
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transient { .. } => true,
            Error::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            _ => false,
        }
    }

    /// Process exit code for a failed run
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::PublishedButNotRecorded { .. } => 3,
            _ => 1,
        }
    }
}

/// Result type alias for agentparl
pub type Result<T> = std::result::Result<T, Error>;
