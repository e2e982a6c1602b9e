// Azure OpenAI chat-completions adapter
// Endpoint shape: {endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}
// Authentication uses the `api-key` header rather than a bearer token.

use crate::config::LLMConfig;
use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct AzureOpenAIAdapter {
    client: Client,
    endpoint: String,
    deployment: String,
    api_key: String,
    api_version: String,
}

// Request types for the chat-completions API
#[derive(Serialize)]
struct AzureChatRequest<'a> {
    messages: Vec<AzureMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct AzureMessage<'a> {
    role: String,
    content: &'a str,
}

// Response types
#[derive(Deserialize)]
struct AzureChatResponse {
    choices: Vec<AzureChoice>,
    #[serde(default)]
    usage: Option<AzureUsage>,
}

#[derive(Deserialize)]
struct AzureChoice {
    message: AzureResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct AzureResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct AzureUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct AzureErrorResponse {
    error: AzureError,
}

#[derive(Deserialize)]
struct AzureError {
    message: String,
    code: Option<String>,
}

impl AzureOpenAIAdapter {
    pub fn new(config: &LLMConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            deployment: config.deployment.clone(),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint, self.deployment
        )
    }
}

#[async_trait]
impl LLMAdapter for AzureOpenAIAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let body = AzureChatRequest {
            messages: request
                .messages
                .iter()
                .map(|m| AzureMessage {
                    role: m.role.to_string(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            deployment = %self.deployment,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("Azure OpenAI request failed: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<AzureErrorResponse>(&error_text) {
                return Err(AppError::LLMApi(format!(
                    "Azure OpenAI error ({}): {} (code: {:?})",
                    status, error_response.error.message, error_response.error.code
                )));
            }

            return Err(AppError::LLMApi(format!(
                "Azure OpenAI error ({}): {}",
                status, error_text
            )));
        }

        let azure_response: AzureChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse Azure OpenAI response: {}", e)))?;

        let choice = azure_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::LLMApi("Azure OpenAI returned no choices".to_string()))?;

        let finish_reason = choice.finish_reason.unwrap_or_else(|| "stop".to_string());
        if finish_reason == "content_filter" {
            return Err(AppError::LLMApi(
                "Azure OpenAI response was blocked by the content filter".to_string(),
            ));
        }

        let usage = azure_response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason,
            usage,
        })
    }
}
