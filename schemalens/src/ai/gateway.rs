//! Model Gateway
//!
//! Routes a request to the provider that serves the requested model, applies
//! the provider's hard timeout and, for structured requests, validates the
//! answer. One provider call per invocation; nothing is retried.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;
use std::time::Instant;

use crate::ai::prompts::schema_suffix;
use crate::ai::provider::{ChatMessage, ChatRequest, VisionProvider};
use crate::ai::response::{parse_structured, StructuredResponse};
use crate::ai::GatewayError;

const GROQ_PREFIX: &str = "groq/";

/// Which backend serves a model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Groq,
}

impl ProviderKind {
    /// Resolve a configured model name to its provider and the name sent on
    /// the wire (`groq/` prefix removed).
    pub fn for_model(model: &str) -> (ProviderKind, &str) {
        match model.strip_prefix(GROQ_PREFIX) {
            Some(stripped) => (ProviderKind::Groq, stripped),
            None => (ProviderKind::OpenAi, model),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Groq => "groq",
        }
    }
}

/// Generation parameters used when a request does not override them.
#[derive(Debug, Clone)]
pub struct GenerationDefaults {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub seed: Option<u64>,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            seed: Some(42),
        }
    }
}

/// A prompt plus image, with optional per-call overrides.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub prompt: String,
    pub image: &'a [u8],
    pub context_messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
}

impl<'a> ModelRequest<'a> {
    pub fn new(prompt: impl Into<String>, image: &'a [u8]) -> Self {
        Self {
            prompt: prompt.into(),
            image,
            context_messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            model: None,
        }
    }

    pub fn with_context(mut self, messages: Vec<ChatMessage>) -> Self {
        self.context_messages = messages;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Uniform entry point for every model call made by the pipeline.
pub struct ModelGateway {
    openai: Option<Arc<dyn VisionProvider>>,
    groq: Option<Arc<dyn VisionProvider>>,
    defaults: GenerationDefaults,
}

impl ModelGateway {
    /// Create a gateway with no providers configured
    pub fn new(defaults: GenerationDefaults) -> Self {
        Self {
            openai: None,
            groq: None,
            defaults,
        }
    }

    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn VisionProvider>) -> Self {
        match kind {
            ProviderKind::OpenAi => self.openai = Some(provider),
            ProviderKind::Groq => self.groq = Some(provider),
        }
        self
    }

    pub fn has_provider(&self, kind: ProviderKind) -> bool {
        self.provider(kind).is_some()
    }

    fn provider(&self, kind: ProviderKind) -> Option<&Arc<dyn VisionProvider>> {
        match kind {
            ProviderKind::OpenAi => self.openai.as_ref(),
            ProviderKind::Groq => self.groq.as_ref(),
        }
    }

    /// Free-text answer.
    pub async fn communicate(&self, request: ModelRequest<'_>) -> Result<String, GatewayError> {
        self.send(request, None).await
    }

    /// Answer parsed and validated as `T`.
    pub async fn communicate_structured<T: StructuredResponse>(
        &self,
        request: ModelRequest<'_>,
    ) -> Result<T, GatewayError> {
        let schema = T::json_schema();
        let text = self.send(request, Some(&schema)).await?;
        parse_structured::<T>(&text)
    }

    async fn send(
        &self,
        request: ModelRequest<'_>,
        schema: Option<&serde_json::Value>,
    ) -> Result<String, GatewayError> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.defaults.model.clone());
        let (kind, wire_model) = ProviderKind::for_model(&model);
        let provider = self
            .provider(kind)
            .ok_or_else(|| GatewayError::ProviderUnavailable(model.clone()))?;

        let mut prompt = request.prompt;
        if let Some(schema) = schema {
            prompt.push_str(&schema_suffix(schema));
        }

        let mut messages = request.context_messages;
        messages.push(ChatMessage::user_with_image(prompt, image_data_url(request.image)));

        let chat = ChatRequest {
            model: wire_model.to_string(),
            messages,
            temperature: request.temperature.unwrap_or(self.defaults.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.defaults.max_tokens),
            seed: self.defaults.seed,
            json_output: schema.is_some(),
        };

        let budget = provider.timeout();
        let started = Instant::now();
        tracing::debug!(
            "Sending request to {} ({}, structured: {})",
            provider.name(),
            chat.model,
            chat.json_output
        );

        match tokio::time::timeout(budget, provider.complete(&chat)).await {
            Ok(result) => {
                tracing::debug!(
                    "{} answered in {}ms",
                    provider.name(),
                    started.elapsed().as_millis()
                );
                result
            }
            Err(_) => {
                tracing::warn!(
                    "Request to {} timed out after {:.1}s",
                    provider.name(),
                    budget.as_secs_f64()
                );
                Err(GatewayError::Timeout {
                    provider: provider.name().to_string(),
                    after: budget,
                })
            }
        }
    }
}

/// Inline `data:` URL for an image, with the MIME type sniffed from its bytes.
pub fn image_data_url(image: &[u8]) -> String {
    let mime = image::guess_format(image)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/jpeg");
    format!("data:{};base64,{}", mime, STANDARD.encode(image))
}
