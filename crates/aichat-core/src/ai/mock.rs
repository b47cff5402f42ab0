use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::ResponseProvider;
use crate::state::{ChatRole, Message};

/// Pause before every mock reply so the loading indicator is visible
pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_millis(1000);

const GREETING_REPLY: &str = "Hello! How can I assist you today?";
const HELP_REPLY: &str = "I'm here to help. What would you like to know?";
const THANKS_REPLY: &str = "You're welcome! Is there anything else I can help with?";
const DETAIL_REPLY: &str = "I'd be happy to discuss more if you can provide additional details.";

/// Local canned responder, no network
#[derive(Debug, Clone)]
pub struct MockResponder {
    delay: Duration,
}

impl MockResponder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Canned reply for `text`. Rules are checked in order, first match wins.
    /// Length is measured in UTF-16 code units.
    pub fn reply_for(text: &str) -> String {
        let lower = text.to_lowercase();

        if lower.contains("hello") || lower.contains("hi") {
            GREETING_REPLY.to_string()
        } else if lower.contains("help") {
            HELP_REPLY.to_string()
        } else if lower.contains("thank") {
            THANKS_REPLY.to_string()
        } else if text.encode_utf16().count() < 10 {
            DETAIL_REPLY.to_string()
        } else {
            format!(
                "I received your message: \"{}\". This is a simulated response.",
                text
            )
        }
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_DELAY)
    }
}

#[async_trait]
impl ResponseProvider for MockResponder {
    async fn complete(&self, history: &[Message]) -> Result<String, ProviderError> {
        tokio::time::sleep(self.delay).await;

        let latest = history
            .iter()
            .rev()
            .find(|m| m.role() == ChatRole::User)
            .map(|m| m.content())
            .unwrap_or_default();

        Ok(Self::reply_for(latest))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
