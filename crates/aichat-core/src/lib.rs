pub mod ai;
pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod provider;
pub mod state;

use std::sync::Arc;

// Re-export main types for convenience
pub use ai::{MockResponder, OpenAIClient};
pub use config::Config;
pub use controller::ChatController;
pub use error::{HistoryError, ProviderError, SendError};
pub use history::Conversation;
pub use provider::{produce_reply, ProviderKind, Reply, ResponseProvider};
pub use state::{ChatMessage, ChatRole, ChatState, Message, MessageId};

/// Build the reply provider selected by `kind` from `config`
pub fn build_provider(
    config: &Config,
    kind: ProviderKind,
) -> Result<Arc<dyn ResponseProvider>, ProviderError> {
    match kind {
        ProviderKind::Mock => Ok(Arc::new(MockResponder::new(config.mock_delay()))),
        ProviderKind::OpenAI => {
            let key = config
                .openai_key()
                .ok_or(ProviderError::MissingApiKey("OpenAI"))?;
            let client = OpenAIClient::new(&key, config.model())?.with_base_url(config.base_url());
            Ok(Arc::new(client))
        }
    }
}
