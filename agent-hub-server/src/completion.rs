use agent_hub_shared::{ChatCompletion, ChatMessage};
use tracing::{error, info};

use crate::error::HubError;
use crate::llm::ChatModel;

// Fixed placeholder; clients only echo it back.
pub const COMPLETION_ID: &str = "chatcmpl-123456789";

/// Model label reported when the request does not name one.
pub const SERVICE_MODEL_LABEL: &str = "langchain-agent-hub";

pub async fn complete(
    messages: &[ChatMessage],
    model: &dyn ChatModel,
    label: &str,
) -> Result<ChatCompletion, HubError> {
    info!(
        "Completing {} messages via {} (reported as {})",
        messages.len(),
        model.model(),
        label
    );

    let content = model.invoke(messages).await.map_err(|e| {
        error!("Completion failed: {}", e);
        e
    })?;

    Ok(ChatCompletion::single(COMPLETION_ID, label, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_hub_shared::{FinishReason, MessageRole};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ChatModel for Echo {
        fn model(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, HubError> {
            Ok(messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("|"))
        }
    }

    struct Broken;

    #[async_trait]
    impl ChatModel for Broken {
        fn model(&self) -> &str {
            "broken"
        }

        async fn invoke(&self, _messages: &[ChatMessage]) -> Result<String, HubError> {
            Err(HubError::Upstream("OpenRouter API error".to_string()))
        }
    }

    #[tokio::test]
    async fn wraps_reply_in_single_stop_choice() {
        let messages = vec![
            ChatMessage::new(MessageRole::System, "sys"),
            ChatMessage::new(MessageRole::User, "Hello"),
        ];
        let completion = complete(&messages, &Echo, "label").await.unwrap();

        assert_eq!(completion.id, COMPLETION_ID);
        assert_eq!(completion.object, "chat.completion");
        assert_eq!(completion.model, "label");
        assert_eq!(completion.choices.len(), 1);
        let choice = &completion.choices[0];
        assert_eq!(choice.index, 0);
        assert_eq!(choice.message.role, MessageRole::Assistant);
        assert_eq!(choice.message.content, "sys|Hello");
        assert_eq!(choice.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn upstream_error_is_propagated_unchanged() {
        let err = complete(&[], &Broken, "label").await.unwrap_err();
        assert_eq!(err.to_string(), "OpenRouter API error");
    }
}
