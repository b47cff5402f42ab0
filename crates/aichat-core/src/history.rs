//! Append-only conversation history
//!
//! This is the context sent to completion providers. Insertion order is
//! chronological order; nothing is ever removed or reordered.

use crate::error::HistoryError;
use crate::state::{ChatRole, Message};

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation whose first entry sets assistant behavior
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    pub fn append(&mut self, message: Message) -> Result<(), HistoryError> {
        if message.role() == ChatRole::User && message.content().trim().is_empty() {
            return Err(HistoryError::EmptyUserMessage);
        }
        self.messages.push(message);
        Ok(())
    }

    /// Owned copy of the current sequence
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
