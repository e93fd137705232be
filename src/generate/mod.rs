//! Content generation
//!
//! Pipelines describe what they want as a [`GenerationRequest`] (a system
//! instruction plus text and image parts); a [`ContentGenerator`] turns it
//! into the message text. Retries for transient provider failures happen
//! inside the generator.

mod gemini;

pub use gemini::*;

use crate::error::Result;
use crate::media::ImageData;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image(ImageData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub parts: Vec<Part>,
}

impl GenerationRequest {
    pub fn text(system_instruction: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            parts: vec![Part::Text(prompt.into())],
        }
    }

    /// Image first, then the instruction text
    pub fn image(
        system_instruction: impl Into<String>,
        image: ImageData,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            parts: vec![Part::Image(image), Part::Text(prompt.into())],
        }
    }

    /// Concatenated text parts, for logging
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Trait for text generation providers
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Model name, for logs
    fn model_name(&self) -> &str;
}
