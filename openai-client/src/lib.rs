//! # OpenAI completion client
//!
//! Thin wrapper around [async-openai] exposing the [`CompletionClient`] seam
//! the relay's router talks to. Carries a bounded per-request timeout and
//! masks the API key in logs.

use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use relay_core::{Prompt, PromptMessage, Role};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Api(String),

    #[error("Completion request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Completion response contained no content")]
    Empty,

    #[error("Invalid completion request: {0}")]
    InvalidRequest(String),
}

/// The completion collaborator: submits a bounded prompt, returns reply text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &Prompt,
        max_completion_tokens: u32,
    ) -> Result<String, CompletionError>;
}

/// Masks an API key for safe logging: first 7 chars + `***` + last 4 chars.
/// Keys of length <= 11 return `***` so no segment leaks.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 {
        "***".to_string()
    } else {
        format!("{}***{}", &token[..7], &token[len - 4..])
    }
}

fn to_request_message(
    message: &PromptMessage,
) -> Result<ChatCompletionRequestMessage, CompletionError> {
    let invalid = |e: async_openai::error::OpenAIError| CompletionError::InvalidRequest(e.to_string());
    match message.role {
        Role::System => {
            let mut args = ChatCompletionRequestSystemMessageArgs::default();
            args.content(message.content.clone());
            if let Some(name) = &message.name {
                args.name(name.as_str());
            }
            Ok(args.build().map_err(invalid)?.into())
        }
        Role::User => {
            let mut args = ChatCompletionRequestUserMessageArgs::default();
            args.content(message.content.clone());
            if let Some(name) = &message.name {
                args.name(name.as_str());
            }
            Ok(args.build().map_err(invalid)?.into())
        }
        Role::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            args.content(message.content.clone());
            if let Some(name) = &message.name {
                args.name(name.as_str());
            }
            Ok(args.build().map_err(invalid)?.into())
        }
    }
}

/// OpenAI-backed [`CompletionClient`]. Wraps the async-openai client; keeps
/// the API key only for masked logging.
#[derive(Clone)]
pub struct OpenAIClient {
    client: Arc<Client<async_openai::config::OpenAIConfig>>,
    model: String,
    timeout: Duration,
    api_key_for_logging: String,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        let api_key_for_logging = api_key.clone();
        let config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Arc::new(Client::with_config(config)),
            model,
            timeout,
            api_key_for_logging,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    /// Sends a chat completion request and returns the first choice's text.
    ///
    /// Logs masked API key and token usage. Errors map into
    /// [`CompletionError`]; an answer with no choices or empty content is
    /// [`CompletionError::Empty`].
    async fn complete(
        &self,
        prompt: &Prompt,
        max_completion_tokens: u32,
    ) -> Result<String, CompletionError> {
        info!(
            model = %self.model,
            message_count = prompt.len(),
            api_key = %mask_token(&self.api_key_for_logging),
            "chat completion request"
        );

        let messages = prompt
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(max_completion_tokens)
            .build()
            .map_err(|e| CompletionError::InvalidRequest(e.to_string()))?;

        if let Ok(json) = serde_json::to_string_pretty(&request) {
            debug!(request_json = %json, "chat completion request JSON");
        }

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| CompletionError::Timeout(self.timeout))?
            .map_err(|e| CompletionError::Api(e.to_string()))?;

        if let Some(ref u) = response.usage {
            info!(
                prompt_tokens = u.prompt_tokens,
                completion_tokens = u.completion_tokens,
                total_tokens = u.total_tokens,
                "chat completion usage"
            );
        }

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(CompletionError::Empty);
        }
        Ok(content)
    }
}
