//! Conversation controller
//!
//! Owns the observable [`ChatState`] and the API-bound [`Conversation`].
//! A send moves the controller from idle to awaiting-reply synchronously,
//! suspends only while the provider works, then returns to idle with the
//! reply (or an error bubble) appended.
//!
//! Error bubbles are shown to the user but never enter the history sent to
//! the provider. A second send while a reply is pending is rejected.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::SendError;
use crate::history::Conversation;
use crate::provider::{produce_reply, Reply, ResponseProvider};
use crate::state::{ChatState, Message};

pub struct ChatController {
    provider: Arc<dyn ResponseProvider>,
    history: Mutex<Conversation>,
    state: watch::Sender<ChatState>,
}

impl ChatController {
    pub fn new(provider: Arc<dyn ResponseProvider>, system_prompt: &str) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            provider,
            history: Mutex::new(Conversation::with_system_prompt(system_prompt)),
            state,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Observe state changes. Receivers never mutate the state.
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ChatState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Snapshot of the history sent to the provider
    pub fn history(&self) -> Vec<Message> {
        self.lock_history().snapshot()
    }

    pub async fn send_message(&self, text: &str) -> Result<(), SendError> {
        if text.trim().is_empty() {
            tracing::debug!("ignoring blank message");
            return Err(SendError::Blank);
        }

        let user_message = Message::user(text);

        // Check-and-set in a single state update so overlapping sends can't
        // both get through.
        let mut accepted = false;
        self.state.send_if_modified(|state| {
            if state.is_loading {
                return false;
            }
            state.messages.insert(0, user_message.clone());
            state.is_loading = true;
            accepted = true;
            true
        });
        if !accepted {
            tracing::debug!("rejecting send while a reply is pending");
            return Err(SendError::Busy);
        }

        let guard = LoadingGuard {
            state: &self.state,
            armed: true,
        };

        let history = {
            let mut history = self.lock_history();
            if let Err(e) = history.append(user_message) {
                // Unreachable after the blank check above
                tracing::warn!(error = %e, "user message not added to history");
            }
            history.snapshot()
        };

        tracing::debug!(
            provider = self.provider.name(),
            history_len = history.len(),
            "requesting reply"
        );
        let reply = produce_reply(self.provider.as_ref(), &history).await;

        if let Reply::Answer(answer) = &reply {
            if let Err(e) = self.lock_history().append(answer.clone()) {
                tracing::warn!(error = %e, "reply not added to history");
            }
        }

        guard.finish(reply.into_message());
        Ok(())
    }

    /// Run a send on a background task
    pub fn spawn_send(self: &Arc<Self>, text: impl Into<String>) -> JoinHandle<Result<(), SendError>> {
        let controller = Arc::clone(self);
        let text = text.into();
        tokio::spawn(async move { controller.send_message(&text).await })
    }

    fn lock_history(&self) -> MutexGuard<'_, Conversation> {
        // The history is only ever appended to, so a poisoned lock still
        // holds a consistent sequence.
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears `is_loading` on every exit path of a send, including when the
/// send future is dropped before the reply arrives.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<ChatState>,
    armed: bool,
}

impl LoadingGuard<'_> {
    /// Publish the reply and return to idle in one update
    fn finish(mut self, reply: Message) {
        self.armed = false;
        self.state.send_modify(|state| {
            state.messages.insert(0, reply);
            state.is_loading = false;
        });
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(|state| state.is_loading = false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockResponder;
    use crate::error::ProviderError;
    use crate::state::ChatRole;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    const PROMPT: &str = "You are a helpful assistant.";

    /// Replies with a fixed string, or fails, and records what it was sent
    struct Scripted {
        fail: bool,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl Scripted {
        fn ok() -> Arc<Self> {
            Arc::new(Self { fail: false, seen: Mutex::new(Vec::new()) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { fail: true, seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl ResponseProvider for Scripted {
        async fn complete(&self, history: &[Message]) -> Result<String, ProviderError> {
            self.seen.lock().unwrap().push(history.to_vec());
            if self.fail {
                Err(ProviderError::Status { code: 502, reason: "Bad Gateway".to_string() })
            } else {
                Ok(format!("reply {}", history.len()))
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Holds every reply until released
    struct Gated {
        release: Notify,
    }

    #[async_trait]
    impl ResponseProvider for Gated {
        async fn complete(&self, _history: &[Message]) -> Result<String, ProviderError> {
            self.release.notified().await;
            Ok("released".to_string())
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_blank_input_changes_nothing() {
        let controller = ChatController::new(Scripted::ok(), PROMPT);
        let rx = controller.subscribe();

        for blank in ["", "   ", "\n\t "] {
            assert_eq!(controller.send_message(blank).await, Err(SendError::Blank));
        }

        assert!(!rx.has_changed().unwrap());
        assert_eq!(controller.state(), ChatState::default());
        assert_eq!(controller.history().len(), 1);
    }

    #[tokio::test]
    async fn test_send_appends_user_then_assistant() {
        let controller = ChatController::new(Scripted::ok(), PROMPT);

        controller.send_message("hello").await.unwrap();

        let state = controller.state();
        assert!(!state.is_loading);
        let visible: Vec<(ChatRole, &str)> =
            state.chronological().map(|m| (m.role(), m.content())).collect();
        assert_eq!(
            visible,
            vec![(ChatRole::User, "hello"), (ChatRole::Assistant, "reply 2")]
        );
        // Display order is newest first
        assert_eq!(state.messages[0].role(), ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_history_grows_two_per_exchange() {
        let provider = Scripted::ok();
        let controller = ChatController::new(provider.clone(), PROMPT);

        for i in 0..4 {
            controller.send_message(&format!("question {}", i)).await.unwrap();
        }

        let history = controller.history();
        assert_eq!(history.len(), 2 * 4 + 1);
        assert_eq!(history[0].role(), ChatRole::System);
        for pair in history[1..].chunks(2) {
            assert_eq!(pair[0].role(), ChatRole::User);
            assert_eq!(pair[1].role(), ChatRole::Assistant);
        }
        for window in history.windows(2) {
            assert!(window[0].timestamp() <= window[1].timestamp());
        }

        // Each request carried everything before it
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn test_failure_is_visible_but_not_in_history() {
        let controller = ChatController::new(Scripted::failing(), PROMPT);

        controller.send_message("anyone there?").await.unwrap();

        let state = controller.state();
        assert!(!state.is_loading);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].role(), ChatRole::Assistant);
        assert_eq!(state.messages[0].content(), "API Error: 502 - Bad Gateway");

        let history = controller.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content(), "anyone there?");
    }

    #[tokio::test]
    async fn test_loading_spans_the_provider_call() {
        let provider = Arc::new(Gated { release: Notify::new() });
        let controller = Arc::new(ChatController::new(provider.clone(), PROMPT));
        let mut rx = controller.subscribe();

        let handle = controller.spawn_send("long question here");

        rx.wait_for(|s| s.is_loading).await.unwrap();
        {
            let state = controller.state();
            assert_eq!(state.messages.len(), 1);
            assert_eq!(state.messages[0].role(), ChatRole::User);
        }

        provider.release.notify_one();
        handle.await.unwrap().unwrap();

        let state = controller.state();
        assert!(!state.is_loading);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].content(), "released");
    }

    #[tokio::test]
    async fn test_overlapping_send_is_rejected() {
        let provider = Arc::new(Gated { release: Notify::new() });
        let controller = Arc::new(ChatController::new(provider.clone(), PROMPT));
        let mut rx = controller.subscribe();

        let first = controller.spawn_send("first question");
        rx.wait_for(|s| s.is_loading).await.unwrap();

        assert_eq!(controller.send_message("second").await, Err(SendError::Busy));
        assert_eq!(controller.state().messages.len(), 1);

        provider.release.notify_one();
        first.await.unwrap().unwrap();

        assert_eq!(controller.state().messages.len(), 2);
        assert_eq!(controller.history().len(), 3);
    }

    #[tokio::test]
    async fn test_dropped_send_clears_loading() {
        let provider = Arc::new(Gated { release: Notify::new() });
        let controller = ChatController::new(provider, PROMPT);

        let result =
            tokio::time::timeout(Duration::from_millis(20), controller.send_message("never answered"))
                .await;
        assert!(result.is_err());

        assert!(!controller.is_loading());
        assert_eq!(controller.state().messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_round_trip() {
        let controller = ChatController::new(Arc::new(MockResponder::default()), PROMPT);

        controller.send_message("hi there").await.unwrap();
        controller.send_message("thanks a ton").await.unwrap();

        let replies: Vec<String> = controller
            .state()
            .chronological()
            .filter(|m| m.role() == ChatRole::Assistant)
            .map(|m| m.content().to_string())
            .collect();
        assert_eq!(
            replies,
            vec![
                "Hello! How can I assist you today?",
                "You're welcome! Is there anything else I can help with?",
            ]
        );
        assert_eq!(controller.provider_name(), "mock");
    }

    #[tokio::test]
    async fn test_remote_failure_then_success() {
        use crate::ai::openai::{OpenAIClient, DEFAULT_MODEL};
        use crate::state::ChatMessage;
        use serde_json::json;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[derive(serde::Deserialize)]
        struct Body {
            messages: Vec<ChatMessage>,
        }

        let mock_server = MockServer::start().await;
        let client = OpenAIClient::new("test-key", DEFAULT_MODEL)
            .unwrap()
            .with_base_url(&mock_server.uri());
        let controller = ChatController::new(Arc::new(client), PROMPT);

        // Server error: visible bubble, history untouched by it
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        controller.send_message("first question").await.unwrap();

        let state = controller.state();
        assert!(!state.is_loading);
        assert_eq!(state.messages[0].role(), ChatRole::Assistant);
        assert_eq!(state.messages[0].content(), "API Error: 500 - Internal Server Error");
        let history = controller.history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| !m.content().contains("API Error")));

        // Successful replies enter the history and go out with the next request
        mock_server.reset().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "first answer"}}]
            })))
            .mount(&mock_server)
            .await;

        controller.send_message("second question").await.unwrap();
        controller.send_message("third question").await.unwrap();

        let contents: Vec<String> = controller
            .history()
            .iter()
            .map(|m| m.content().to_string())
            .collect();
        assert_eq!(
            contents,
            vec![
                PROMPT,
                "first question",
                "second question",
                "first answer",
                "third question",
                "first answer",
            ]
        );

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let last: Body = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(last.messages.len(), 5);
        assert_eq!(last.messages[3].role, ChatRole::Assistant);
        assert_eq!(last.messages[3].content, "first answer");
        assert_eq!(last.messages[4].content, "third question");
    }
}
