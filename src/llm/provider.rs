use async_trait::async_trait;
use crate::config::LLMConfig;
use crate::types::{LLMRequest, LLMResponse, AppResult};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Model client shared by every agent run.
///
/// Constructed once at startup and never mutated afterwards; callers hold it
/// behind an `Arc`.
pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl LLM {
    /// Azure OpenAI deployment described by the configuration
    pub fn from_config(config: &LLMConfig) -> Self {
        Self {
            adapter: Box::new(crate::llm::azure::AzureOpenAIAdapter::new(config)),
            model: config.deployment.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Wrap an arbitrary adapter (used by tests and alternative backends)
    pub fn with_adapter(adapter: Box<dyn LLMAdapter>, model: impl Into<String>) -> Self {
        Self {
            adapter,
            model: model.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build a request for this model from a message list
    pub fn request(&self, messages: Vec<crate::types::LLMMessage>) -> LLMRequest {
        LLMRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }
}
