//! Error types for the conversation core

use thiserror::Error;

/// Failure while producing a reply.
///
/// The `Display` text is what ends up in the assistant bubble when the
/// failure is surfaced to the user.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non-success HTTP status from the completion endpoint
    #[error("API Error: {code} - {reason}")]
    Status { code: u16, reason: String },

    /// Response parsed but carried no choices
    #[error("No response from AI")]
    EmptyResponse,

    #[error("Error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Error: {0} API key not configured")]
    MissingApiKey(&'static str),
}

impl ProviderError {
    pub fn status(code: reqwest::StatusCode) -> Self {
        Self::Status {
            code: code.as_u16(),
            reason: code.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }
}

/// Rejection of a `send_message` call. The controller state is untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("message is blank")]
    Blank,

    #[error("a reply is already pending")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("user message content is empty")]
    EmptyUserMessage,
}
