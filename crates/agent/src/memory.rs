use std::collections::HashMap;

use async_trait::async_trait;
use netscout_core::{Message, SessionId};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("system message rejected at index {index} of session `{session}`")]
    MisplacedSystemMessage { session: SessionId, index: usize },
}

/// Append-only message history of one session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn starts_with_system(&self) -> bool {
        self.messages.first().is_some_and(Message::is_system)
    }

    fn check(&self, message: &Message, index: usize, session: &SessionId) -> Result<(), MemoryError> {
        if message.is_system() && index > 0 {
            return Err(MemoryError::MisplacedSystemMessage { session: session.clone(), index });
        }
        Ok(())
    }
}

impl IntoIterator for Conversation {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

/// Session-scoped conversation persistence. Reads return a snapshot; writes only append.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn read(&self, session: &SessionId) -> Result<Conversation, MemoryError>;
    async fn append(&self, session: &SessionId, message: Message) -> Result<(), MemoryError>;
    /// Appends all messages or none of them.
    async fn append_all(&self, session: &SessionId, messages: Vec<Message>) -> Result<(), MemoryError>;
}

/// Process-lifetime store. Sessions are never evicted.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: RwLock<HashMap<SessionId, Conversation>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn read(&self, session: &SessionId) -> Result<Conversation, MemoryError> {
        Ok(self.sessions.read().await.get(session).cloned().unwrap_or_default())
    }

    async fn append(&self, session: &SessionId, message: Message) -> Result<(), MemoryError> {
        self.append_all(session, vec![message]).await
    }

    async fn append_all(&self, session: &SessionId, messages: Vec<Message>) -> Result<(), MemoryError> {
        let mut sessions = self.sessions.write().await;
        let conversation = sessions.entry(session.clone()).or_default();

        let start = conversation.len();
        for (offset, message) in messages.iter().enumerate() {
            conversation.check(message, start + offset, session)?;
        }
        conversation.messages.extend(messages);
        Ok(())
    }
}
