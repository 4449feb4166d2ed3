//! Process-wide settings.
//!
//! Built once at start-up (environment plus an optional `.env` file) and passed
//! by reference to every pipeline component.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::ai::openai::{DEFAULT_GROQ_URL, DEFAULT_OPENAI_URL};
use crate::ai::{GenerationDefaults, ModelGateway, OpenAiCompatibleClient, ProviderKind};
use crate::detector::{DetectorConfig, RectificationPolicy};
use crate::schema::ComponentType;

pub const DEFAULT_MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingCredential(String),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
    #[error("Failed to read component prompts from {path}: {source}")]
    PromptsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse component prompts: {0}")]
    PromptsParse(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub max_image_size: usize,
    pub llm_api_timeout: Duration,
    pub groq_api_timeout: Duration,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub seed: u64,
    pub max_parallel_requests: usize,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    pub rectification_policy: RectificationPolicy,
    pub debug_dir: Option<PathBuf>,
    pub component_prompts_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            llm_api_timeout: Duration::from_secs(30),
            groq_api_timeout: Duration::from_secs(30),
            model_name: "gpt-4o".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            seed: 42,
            max_parallel_requests: 1,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_URL.to_string(),
            groq_api_key: None,
            groq_base_url: DEFAULT_GROQ_URL.to_string(),
            rectification_policy: RectificationPolicy::default(),
            debug_dir: None,
            component_prompts_path: None,
        }
    }
}

impl Settings {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let settings = Settings {
            max_image_size: parse_or(&get, "MAX_IMAGE_SIZE", defaults.max_image_size)?,
            llm_api_timeout: parse_seconds(&get, "LLM_API_TIMEOUT", defaults.llm_api_timeout)?,
            groq_api_timeout: parse_seconds(&get, "GROQ_API_TIMEOUT", defaults.groq_api_timeout)?,
            model_name: get("MODEL_NAME").unwrap_or(defaults.model_name),
            temperature: parse_or(&get, "TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_or(&get, "MAX_TOKENS", defaults.max_tokens)?,
            seed: parse_or(&get, "SEED", defaults.seed)?,
            max_parallel_requests: parse_or(
                &get,
                "MAX_PARALLEL_REQUESTS",
                defaults.max_parallel_requests,
            )?,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            groq_api_key: get("GROQ_API_KEY"),
            groq_base_url: get("GROQ_BASE_URL").unwrap_or(defaults.groq_base_url),
            rectification_policy: parse_or(
                &get,
                "RECTIFICATION_POLICY",
                defaults.rectification_policy,
            )?,
            debug_dir: get("DEBUG_DIR").map(PathBuf::from),
            component_prompts_path: get("COMPONENT_PROMPTS_PATH").map(PathBuf::from),
        };

        settings.check_ranges()?;
        Ok(settings)
    }

    fn check_ranges(&self) -> Result<(), ConfigError> {
        if self.max_parallel_requests == 0 {
            return Err(invalid("MAX_PARALLEL_REQUESTS", "must be at least 1"));
        }
        if self.max_image_size == 0 {
            return Err(invalid("MAX_IMAGE_SIZE", "must be greater than 0"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(invalid("TEMPERATURE", "must be within [0, 2]"));
        }
        if self.max_tokens == 0 {
            return Err(invalid("MAX_TOKENS", "must be greater than 0"));
        }
        Ok(())
    }

    /// Provider that serves `MODEL_NAME`.
    pub fn provider_kind(&self) -> ProviderKind {
        ProviderKind::for_model(&self.model_name).0
    }

    /// Start-up check: value ranges plus credentials for the selected provider.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_ranges()?;
        match self.provider_kind() {
            ProviderKind::Groq if self.groq_api_key.is_none() => {
                Err(ConfigError::MissingCredential("GROQ_API_KEY".to_string()))
            }
            ProviderKind::OpenAi if self.openai_api_key.is_none() => {
                Err(ConfigError::MissingCredential("OPENAI_API_KEY".to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn generation_defaults(&self) -> GenerationDefaults {
        GenerationDefaults {
            model: self.model_name.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            seed: Some(self.seed),
        }
    }

    /// Gateway with a client for every provider that has credentials.
    pub fn build_gateway(&self) -> ModelGateway {
        let mut gateway = ModelGateway::new(self.generation_defaults());
        if let Some(key) = &self.openai_api_key {
            gateway = gateway.with_provider(
                ProviderKind::OpenAi,
                Arc::new(OpenAiCompatibleClient::openai(
                    key.clone(),
                    Some(self.openai_base_url.clone()),
                    self.llm_api_timeout,
                )),
            );
        }
        if let Some(key) = &self.groq_api_key {
            gateway = gateway.with_provider(
                ProviderKind::Groq,
                Arc::new(OpenAiCompatibleClient::groq(
                    key.clone(),
                    Some(self.groq_base_url.clone()),
                    self.groq_api_timeout,
                )),
            );
        }
        gateway
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            policy: self.rectification_policy,
            debug_dir: self.debug_dir.clone(),
            ..DetectorConfig::default()
        }
    }

    pub fn component_prompts(&self) -> Result<ComponentPrompts, ConfigError> {
        match &self.component_prompts_path {
            Some(path) => ComponentPrompts::load(path),
            None => Ok(ComponentPrompts::builtin()),
        }
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| invalid(key, format!("'{}': {}", raw, e))),
        None => Ok(default),
    }
}

fn parse_seconds<G>(get: &G, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: f64 = parse_or(get, key, default.as_secs_f64())?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid(key, "must be a positive number of seconds"));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Prompt text for one component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPrompt {
    /// Discriminative instructions for the presence check
    pub identification: String,
    /// Short description of how the symbol is drawn
    pub visual_representation: String,
}

impl ComponentPrompt {
    pub fn builtin(component_type: ComponentType) -> Self {
        Self {
            identification: component_type.identification().to_string(),
            visual_representation: component_type.visual_representation().to_string(),
        }
    }
}

/// Per-type prompt table. Built-in text can be overridden per type from a JSON
/// file of the form `{"led": {"identification": "...", "visual_representation": "..."}}`.
#[derive(Debug, Clone)]
pub struct ComponentPrompts {
    overrides: HashMap<ComponentType, ComponentPrompt>,
}

impl ComponentPrompts {
    pub fn builtin() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let overrides: HashMap<ComponentType, ComponentPrompt> = serde_json::from_str(json)?;
        Ok(Self { overrides })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::PromptsIo {
            path: path.to_path_buf(),
            source,
        })?;
        let prompts = Self::from_json_str(&json)?;
        tracing::info!(
            "Loaded {} component prompt override(s) from {}",
            prompts.overrides.len(),
            path.display()
        );
        Ok(prompts)
    }

    pub fn get(&self, component_type: ComponentType) -> ComponentPrompt {
        self.overrides
            .get(&component_type)
            .cloned()
            .unwrap_or_else(|| ComponentPrompt::builtin(component_type))
    }
}

impl Default for ComponentPrompts {
    fn default() -> Self {
        Self::builtin()
    }
}
