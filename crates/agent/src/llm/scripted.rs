use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use netscout_core::{Message, ToolDefinition};

use crate::llm::{LlmClient, LlmError};

/// Replays queued replies in order and records every conversation it was shown.
///
/// Used for offline runs and tests; an exhausted script fails the call.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<Message, LlmError>>>,
    seen: Mutex<Vec<Vec<Message>>>,
    delay: Option<Duration>,
}

impl ScriptedLlm {
    pub fn new(replies: impl IntoIterator<Item = Result<Message, LlmError>>) -> Self {
        Self { replies: Mutex::new(replies.into_iter().collect()), ..Self::default() }
    }

    pub fn from_messages(replies: impl IntoIterator<Item = Message>) -> Self {
        Self::new(replies.into_iter().map(Ok))
    }

    /// Waits before answering, so callers can observe in-flight state.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, reply: Result<Message, LlmError>) {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).push_back(reply);
    }

    pub fn conversations(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        conversation: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<Message, LlmError> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).push(conversation.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Malformed("scripted replies exhausted".to_string())))
    }
}
