//! Reply providers and the boundary the controller talks to

use std::time::Instant;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::state::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Mock,
    OpenAI,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Mock => "mock",
            ProviderKind::OpenAI => "openai",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mock" => Some(ProviderKind::Mock),
            "openai" => Some(ProviderKind::OpenAI),
            _ => None,
        }
    }

    pub fn all() -> Vec<ProviderKind> {
        vec![ProviderKind::Mock, ProviderKind::OpenAI]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Mock => "Mock (Local)",
            ProviderKind::OpenAI => "ChatGPT (OpenAI)",
        }
    }
}

/// Something that can produce the next assistant turn from the history
#[async_trait]
pub trait ResponseProvider: Send + Sync {
    async fn complete(&self, history: &[Message]) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

/// Outcome of asking a provider for the next turn
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A real reply; belongs in the conversation history
    Answer(Message),
    /// A synthesized error bubble; shown to the user only
    Failure(Message),
}

impl Reply {
    pub fn message(&self) -> &Message {
        match self {
            Reply::Answer(msg) | Reply::Failure(msg) => msg,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            Reply::Answer(msg) | Reply::Failure(msg) => msg,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Reply::Failure(_))
    }
}

/// Ask `provider` for a reply. Never fails: errors become an assistant
/// message carrying the error text.
pub async fn produce_reply(provider: &dyn ResponseProvider, history: &[Message]) -> Reply {
    let start = Instant::now();
    let result = provider.complete(history).await;
    let duration = start.elapsed();

    match result {
        Ok(content) => {
            tracing::info!(
                provider = provider.name(),
                duration_ms = %duration.as_millis(),
                history_len = history.len(),
                "reply completed"
            );
            Reply::Answer(Message::assistant(content))
        }
        Err(e) => {
            tracing::warn!(
                provider = provider.name(),
                duration_ms = %duration.as_millis(),
                error = %e,
                "reply failed"
            );
            Reply::Failure(Message::assistant(e.to_string()))
        }
    }
}
