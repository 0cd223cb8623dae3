//! Chat model access for answer generation

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

pub mod client;
pub mod prompts;

pub use client::LlmClient;
pub use client::LlmProvider;

use crate::config::LlmConfig;
use crate::errors::LabRagError;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a chat exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Sampling settings sent with each completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1024,
        }
    }
}

impl From<&LlmConfig> for GenerationParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// A hosted or local chat completion backend
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], params: &GenerationParams)
        -> Result<String>;
}

/// Renders prompts and asks the chat model for an answer
#[derive(Clone)]
pub struct GenerationClient {
    model: Arc<dyn ChatModel>,
    params: GenerationParams,
}

impl GenerationClient {
    pub fn new(model: Arc<dyn ChatModel>, params: GenerationParams) -> Self {
        Self { model, params }
    }

    pub const fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Answer `user_query` from `context` under the given system prompt
    ///
    /// # Errors
    /// - Backend failures from the chat model
    /// - `LlmError` when the model returns no text
    pub async fn answer(&self, system_prompt: &str, context: &str, user_query: &str) -> Result<String> {
        let messages = [
            ChatMessage::system(prompts::render_system_prompt(system_prompt, context)),
            ChatMessage::user(user_query),
        ];
        debug!(
            "Sending {} context chars to the chat model",
            context.chars().count()
        );

        let answer = self.model.complete(&messages, &self.params).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(LabRagError::LlmError(
                "Model returned an empty answer".to_string(),
            ));
        }
        Ok(answer.to_string())
    }
}
