//! Generation provider trait and configuration

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for text generation providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// Ollama local server
    Ollama { url: String, model: String },
    /// OpenAI-compatible chat API (works with OpenAI, Azure, Together, etc.)
    OpenAI {
        url: String,
        api_key: String,
        model: String,
    },
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::Ollama {
            url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
        }
    }
}

/// Shape the provider is asked to answer in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub response_format: ResponseFormat,
}

impl GenerationOptions {
    pub fn json(temperature: f32) -> Self {
        Self {
            temperature,
            response_format: ResponseFormat::Json,
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            response_format: ResponseFormat::Text,
        }
    }
}

/// Trait for text generation providers
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one completion and return the raw response text
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> anyhow::Result<String>;

    /// Get the model name (for logs)
    fn model_name(&self) -> &str;
}

/// Strip a markdown code fence some models wrap JSON answers in.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Create a generation provider from configuration
pub fn create_generator(config: &ProviderConfig) -> anyhow::Result<Box<dyn TextGenerator>> {
    match config {
        ProviderConfig::Ollama { url, model } => {
            let provider = super::ollama::OllamaGenerator::new(url, model)?;
            Ok(Box::new(provider))
        }
        ProviderConfig::OpenAI {
            url,
            api_key,
            model,
        } => {
            let provider = super::openai::OpenAiGenerator::new(url, api_key, model)?;
            Ok(Box::new(provider))
        }
    }
}
