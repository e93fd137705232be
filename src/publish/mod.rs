//! Message publishing
//!
//! A [`Publisher`] delivers one [`OutgoingMessage`] to the channel and
//! reports what it delivered. An acknowledgement with `ok == false` counts
//! as a failed publish.

mod telegram;

pub use telegram::*;

use crate::error::Result;
use crate::media::ImageData;
use async_trait::async_trait;
use serde::Serialize;

/// How the channel should render the message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Markdown,
    Html,
    Plain,
}

impl ParseMode {
    pub fn as_telegram(&self) -> Option<&'static str> {
        match self {
            ParseMode::Markdown => Some("Markdown"),
            ParseMode::Html => Some("HTML"),
            ParseMode::Plain => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub chat_id: String,
    pub text: String,
    pub image: Option<ImageData>,
    pub parse_mode: ParseMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishAck {
    pub ok: bool,
    pub message_ids: Vec<i64>,
    pub description: Option<String>,
}

/// Trait for messaging channels
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: &OutgoingMessage) -> Result<PublishAck>;
}
