//! Structured model gateway
//!
//! Sends a prompt plus an image to a vision-capable chat model and returns
//! either raw text or a validated structured value.

pub mod gateway;
pub mod openai;
pub mod prompts;
pub mod provider;
pub mod response;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;
use thiserror::Error;

pub use gateway::{GenerationDefaults, ModelGateway, ModelRequest, ProviderKind};
pub use openai::OpenAiCompatibleClient;
pub use provider::{ChatMessage, ChatRequest, ContentPart, VisionProvider};
pub use response::StructuredResponse;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Model request to {provider} timed out after {}s", .after.as_secs_f64())]
    Timeout { provider: String, after: Duration },
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("No provider configured for model '{0}'")]
    ProviderUnavailable(String),
    #[error("Request limiter closed")]
    LimiterClosed,
}

impl GatewayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout { .. })
    }

    pub fn is_invalid_response(&self) -> bool {
        matches!(self, GatewayError::InvalidResponse(_))
    }
}
