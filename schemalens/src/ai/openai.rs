//! OpenAI-compatible chat completions client.
//!
//! Groq exposes the same wire format under its own base URL, so one client
//! type serves both providers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ai::provider::{ChatMessage, ChatRequest, VisionProvider};
use crate::ai::GatewayError;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1";

pub struct OpenAiCompatibleClient {
    client: Client,
    name: String,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        }
    }

    pub fn openai(api_key: impl Into<String>, base_url: Option<String>, timeout: Duration) -> Self {
        Self::new(
            "openai",
            base_url.unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            api_key,
            timeout,
        )
    }

    pub fn groq(api_key: impl Into<String>, base_url: Option<String>, timeout: Duration) -> Self {
        Self::new(
            "groq",
            base_url.unwrap_or_else(|| DEFAULT_GROQ_URL.to_string()),
            api_key,
            timeout,
        )
    }

    fn body<'a>(&self, request: &'a ChatRequest) -> CompletionBody<'a> {
        CompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: 1.0,
            stream: false,
            seed: request.seed,
            response_format: request.json_output.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

#[async_trait]
impl VisionProvider for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, GatewayError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            GatewayError::InvalidResponse(format!("Failed to parse {} response: {}", self.name, e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("Empty choices array in response".to_string())
            })
    }
}
