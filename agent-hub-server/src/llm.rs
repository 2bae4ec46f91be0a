use std::sync::Arc;
use std::time::Duration;

use agent_hub_shared::{ChatMessage, ChatRequest, MessageRole};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::error::HubError;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Sampling options threaded from the inbound request to the upstream call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CallOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CallOptions {
    pub fn from_request(request: &ChatRequest) -> Self {
        Self {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }
}

/// A handle bound to one upstream model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model(&self) -> &str;

    /// Sends the whole conversation and returns the assistant's reply text.
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, HubError>;
}

/// Builds [`ChatModel`] handles for incoming requests.
pub trait ModelProvider: Send + Sync {
    fn get_client(
        &self,
        model: Option<&str>,
        options: &CallOptions,
    ) -> Result<Arc<dyn ChatModel>, HubError>;
}

/// Provider backed by an OpenAI-compatible endpoint (OpenRouter by default).
pub struct OpenRouterProvider {
    settings: Arc<Settings>,
    http: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
        }
    }
}

impl ModelProvider for OpenRouterProvider {
    fn get_client(
        &self,
        model: Option<&str>,
        options: &CallOptions,
    ) -> Result<Arc<dyn ChatModel>, HubError> {
        let api_key = self
            .settings
            .openrouter_api_key
            .as_ref()
            .ok_or(HubError::MissingCredential)?;

        let model = model
            .unwrap_or(self.settings.default_model.as_str())
            .to_string();
        debug!("Building upstream client for model {}", model);

        let config = OpenAIConfig::new()
            .with_api_base(&self.settings.openrouter_base_url)
            .with_api_key(api_key.expose());
        let client = Client::with_config(config).with_http_client(self.http.clone());

        Ok(Arc::new(OpenAiChatModel {
            client,
            model,
            options: *options,
            timeout: self.settings.upstream_timeout,
        }))
    }
}

pub struct OpenAiChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    options: CallOptions,
    timeout: Duration,
}

impl OpenAiChatModel {
    fn build_request(&self, messages: &[ChatMessage]) -> Result<CreateChatCompletionRequest, OpenAIError> {
        let messages = messages
            .iter()
            .map(convert_to_openai_message)
            .collect::<Result<Vec<_>, _>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(self.options.temperature());
        if let Some(max_tokens) = self.options.max_tokens {
            args.max_tokens(max_tokens);
        }
        args.build()
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, HubError> {
        let request = self.build_request(messages).map_err(HubError::upstream)?;
        info!(
            "Calling upstream model {} with {} messages",
            self.model,
            messages.len()
        );

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                error!("Upstream call to {} timed out", self.model);
                HubError::Upstream(format!(
                    "upstream request timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|e| {
                error!("Upstream call failed: {:?}", e);
                HubError::Upstream(describe_openai_error(&e))
            })?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

fn describe_openai_error(err: &OpenAIError) -> String {
    match err {
        OpenAIError::ApiError(api_err) => api_err.message.clone(),
        other => other.to_string(),
    }
}

fn convert_to_openai_message(msg: &ChatMessage) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = msg.content.clone();
    let message = match msg.role {
        MessageRole::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()?,
        ),
        MessageRole::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()?,
        ),
        MessageRole::Assistant => ChatCompletionRequestMessage::Assistant(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(content)
                .build()?,
        ),
    };
    Ok(message)
}
