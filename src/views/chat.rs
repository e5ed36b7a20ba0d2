use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

use crate::api::{CannonApi, ChatMessage};
use crate::constants::CHAT_FAILURE_REPLY;
use crate::forms::validate_message;
use crate::runtime::SubmitGuard;
use crate::utils::CannonResult;

/// Conversation with the coaching assistant
pub struct ChatView {
    api: Arc<dyn CannonApi>,
    messages: Mutex<Vec<ChatMessage>>,
    sending: SubmitGuard,
}

impl ChatView {
    pub fn new(api: Arc<dyn CannonApi>) -> Self {
        Self {
            api,
            messages: Mutex::new(Vec::new()),
            sending: SubmitGuard::new("Sending message"),
        }
    }

    /// Replace the buffer with the stored history
    pub async fn load(&self) -> CannonResult<usize> {
        let history = self.api.get_chat_history().await?;
        let count = history.messages.len();
        *self.messages.lock() = history.messages;
        Ok(count)
    }

    /// Send a message, showing it before the reply arrives
    ///
    /// On failure the canned apology is appended as the assistant's turn and
    /// the error is still returned.
    pub async fn send(&self, text: &str) -> CannonResult<ChatMessage> {
        let text = validate_message(text)?;
        let _in_flight = self.sending.try_begin()?;

        self.messages.lock().push(ChatMessage::user(text));

        match self.api.send_chat_message(text).await {
            Ok(reply) => {
                let message = ChatMessage::assistant(reply.response);
                self.messages.lock().push(message.clone());
                Ok(message)
            }
            Err(e) => {
                warn!("chat send failed: {}", e);
                self.messages
                    .lock()
                    .push(ChatMessage::assistant(CHAT_FAILURE_REPLY));
                Err(e)
            }
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ChatHistory, ChatReply, ChatRole, MockCannonApi};
    use crate::utils::CannonError;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_load_then_send() {
        let mut api = MockCannonApi::new();
        api.expect_get_chat_history().times(1).returning(|| {
            Ok(ChatHistory {
                messages: vec![ChatMessage::assistant("Welcome back")],
            })
        });
        api.expect_send_chat_message()
            .withf(|text| text == "How do I fix my posture?")
            .times(1)
            .returning(|_| {
                Ok(ChatReply {
                    response: "Start with wall angels.".to_string(),
                })
            });

        let view = ChatView::new(Arc::new(api));
        assert_eq!(view.load().await.unwrap(), 1);

        let reply = view.send("  How do I fix my posture? ").await.unwrap();
        assert_eq!(reply.content, "Start with wall angels.");

        let roles: Vec<ChatRole> = view.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
        );
    }

    #[tokio::test]
    async fn test_failure_appends_apology() {
        let mut api = MockCannonApi::new();
        api.expect_send_chat_message()
            .returning(|_| Err(CannonError::Network("timeout".to_string())));

        let view = ChatView::new(Arc::new(api));
        assert!(view.send("hello").await.is_err());

        let messages = view.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::user("hello"));
        assert_eq!(messages[1], ChatMessage::assistant(CHAT_FAILURE_REPLY));
    }

    #[tokio::test]
    async fn test_blank_message_is_not_sent() {
        let mut api = MockCannonApi::new();
        api.expect_send_chat_message().never();

        let view = ChatView::new(Arc::new(api));
        assert!(view.send("   ").await.is_err());
        assert!(view.messages().is_empty());
    }
}
