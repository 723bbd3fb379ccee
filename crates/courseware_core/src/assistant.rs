//! crates/courseware_core/src/assistant.rs
//!
//! The course assistant: one running conversation per workspace. Each reply is
//! grounded on the course context as it stands when the message is sent.

use crate::domain::CourseContext;
use crate::error::{CoreError, CoreResult};
use crate::ports::AssistantService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const GREETING: &str = "Hello! I am your course assistant. I can polish content, answer \
academic questions, or sketch teaching cases from the materials you have uploaded. \
How can I help?";
const CLEARED: &str = "The conversation has been cleared.";
const BUSY_REPLY: &str = "Sorry, the assistant is busy right now. Please try again shortly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

pub struct Assistant {
    service: Arc<dyn AssistantService>,
    history: Mutex<Vec<ChatMessage>>,
}

impl Assistant {
    pub fn new(service: Arc<dyn AssistantService>) -> Self {
        Self {
            service,
            history: Mutex::new(vec![ChatMessage::model(GREETING)]),
        }
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.history.lock().await.clone()
    }

    /// Sends one user message and records the reply.
    ///
    /// The history lock is held for the whole exchange, so concurrent sends
    /// are answered one after another. A failed call leaves the user's message
    /// and an apology in the history and returns the error.
    pub async fn send(&self, context: &CourseContext, text: &str) -> CoreResult<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::EmptyMessage);
        }

        let mut history = self.history.lock().await;
        history.push(ChatMessage::user(text));
        match self.service.chat(context, &history).await {
            Ok(reply) => {
                let reply = ChatMessage::model(reply);
                history.push(reply.clone());
                info!(messages = history.len(), "Assistant replied.");
                Ok(reply)
            }
            Err(e) => {
                warn!("Assistant call failed: {}", e);
                history.push(ChatMessage::model(BUSY_REPLY));
                Err(e.into())
            }
        }
    }

    pub async fn clear(&self) {
        *self.history.lock().await = vec![ChatMessage::model(CLEARED)];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Echo {
        seen: StdMutex<Vec<(String, Vec<ChatMessage>)>>,
        fail: bool,
    }

    #[async_trait]
    impl AssistantService for Echo {
        async fn chat(&self, context: &CourseContext, history: &[ChatMessage]) -> PortResult<String> {
            self.seen
                .lock()
                .unwrap()
                .push((context.course_name.clone(), history.to_vec()));
            if self.fail {
                return Err(PortError::Transient("429 Too Many Requests".to_string()));
            }
            let last = history.last().map(|m| m.text.as_str()).unwrap_or_default();
            Ok(format!("you said: {}", last))
        }
    }

    fn course(name: &str) -> CourseContext {
        CourseContext {
            course_name: name.to_string(),
            ..CourseContext::default()
        }
    }

    #[tokio::test]
    async fn replies_see_the_whole_conversation() {
        let echo = Arc::new(Echo::default());
        let assistant = Assistant::new(echo.clone());

        assistant.send(&course("Physics"), "What is inertia?").await.unwrap();
        let reply = assistant.send(&course("Physics"), "  An example?  ").await.unwrap();

        assert_eq!(reply, ChatMessage::model("you said: An example?"));
        let seen = echo.seen.lock().unwrap();
        assert_eq!(seen[1].0, "Physics");
        assert_eq!(
            seen[1].1.iter().map(|m| m.role).collect::<Vec<_>>(),
            vec![ChatRole::Model, ChatRole::User, ChatRole::Model, ChatRole::User]
        );
        assert_eq!(assistant.messages().await.len(), 5);
    }

    #[tokio::test]
    async fn blank_messages_never_reach_the_model() {
        let echo = Arc::new(Echo::default());
        let assistant = Assistant::new(echo.clone());

        let result = assistant.send(&course("Physics"), "   ").await;

        assert!(matches!(result, Err(CoreError::EmptyMessage)));
        assert!(echo.seen.lock().unwrap().is_empty());
        assert_eq!(assistant.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn a_failed_call_records_an_apology() {
        let assistant = Assistant::new(Arc::new(Echo {
            fail: true,
            ..Default::default()
        }));

        let result = assistant.send(&course("Physics"), "Hello").await;

        assert!(matches!(result, Err(CoreError::Port(PortError::Transient(_)))));
        let messages = assistant.messages().await;
        assert_eq!(messages[1], ChatMessage::user("Hello"));
        assert_eq!(messages[2], ChatMessage::model(BUSY_REPLY));
    }

    #[tokio::test]
    async fn clearing_leaves_a_single_notice() {
        let assistant = Assistant::new(Arc::new(Echo::default()));
        assistant.send(&course("Physics"), "Hello").await.unwrap();

        assistant.clear().await;

        assert_eq!(assistant.messages().await, vec![ChatMessage::model(CLEARED)]);
    }
}
