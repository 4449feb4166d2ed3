//! Vision Provider Trait
//!
//! Defines a common interface for chat-completion backends that accept images
//! (OpenAI, Groq, test doubles).

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::ai::GatewayError;

/// One part of a multimodal user message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A chat message in OpenAI wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message carrying a prompt and one inline image.
    pub fn user_with_image(prompt: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: prompt.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: image_url.into() },
                },
            ]),
        }
    }

    /// Concatenated text parts of the message.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Fully resolved request handed to a provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model name as the provider expects it (routing prefix already removed)
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub seed: Option<u64>,
    /// Ask the provider for a JSON object response
    pub json_output: bool,
}

impl ChatRequest {
    /// Text of the last user message, which carries the prompt.
    pub fn prompt(&self) -> String {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.text())
            .unwrap_or_default()
    }
}

/// Common trait for all vision-capable providers
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    /// Hard budget for a single call to this provider
    fn timeout(&self) -> Duration;

    /// Send one chat completion and return the assistant text
    async fn complete(&self, request: &ChatRequest) -> Result<String, GatewayError>;
}
