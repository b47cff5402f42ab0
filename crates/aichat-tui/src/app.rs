use std::sync::Arc;

use aichat_core::{ChatController, ChatState, SendError};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat pane
    pub scroll: u16,
    pub follow: bool, // keep the newest message in view
    pub chat_height: u16,
    pub chat_width: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Header label: provider display name, plus model for remote providers
    pub title: String,

    controller: Arc<ChatController>,
    state: watch::Receiver<ChatState>,
}

impl App {
    pub fn new(controller: Arc<ChatController>, title: String) -> Self {
        let state = controller.subscribe();
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            cursor: 0,

            scroll: 0,
            follow: true,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            title,

            controller,
            state,
        }
    }

    /// Latest published conversation state
    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Hand the input line to the controller. The input is kept when the
    /// controller would refuse it (blank, or a reply still pending).
    pub fn submit(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        if self.is_loading() {
            tracing::debug!("reply pending, keeping input");
            return;
        }

        let text = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.follow = true;

        let handle = self.controller.spawn_send(text);
        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(SendError::Blank)) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "send rejected"),
                Err(e) => tracing::error!(error = %e, "send task failed"),
            }
        });
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.scroll = self.scroll.saturating_add(lines).min(max);
        if self.scroll == max {
            self.follow = true;
        }
    }

    /// Scroll chat to bottom so the newest message (or "Thinking...") is visible
    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.total_chat_lines().saturating_sub(visible_height)
    }

    /// Rendered height of the chat pane content, estimating wraps
    fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let state = self.state.borrow();
        let mut total_lines: usize = 0;

        for msg in state.chronological() {
            total_lines = total_lines.saturating_add(1); // Role line ("You:" or "AI:")
            for line in msg.content().lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add(char_count / wrap_width + 1);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if state.is_loading {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }

        // Scroll offsets are u16 in ratatui
        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aichat_core::MockResponder;
    use std::time::Duration;

    fn test_app() -> App {
        let provider = Arc::new(MockResponder::new(Duration::from_millis(10)));
        let controller = Arc::new(ChatController::new(provider, "test"));
        App::new(controller, "mock".to_string())
    }

    #[tokio::test]
    async fn test_blank_submit_keeps_input() {
        let mut app = test_app();
        app.input = "   ".to_string();
        app.cursor = 3;

        app.submit();

        assert_eq!(app.input, "   ");
        assert_eq!(app.cursor, 3);
        assert!(app.snapshot().messages.is_empty());
    }

    #[tokio::test]
    async fn test_submit_clears_input_and_gets_reply() {
        let mut app = test_app();
        let mut rx = app.controller.subscribe();
        app.input = "hi there".to_string();
        app.cursor = 8;

        app.submit();
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);

        let state = rx
            .wait_for(|s| s.messages.len() == 2 && !s.is_loading)
            .await
            .unwrap()
            .clone();
        assert_eq!(
            state.messages[0].content(),
            "Hello! How can I assist you today?"
        );
    }

    #[tokio::test]
    async fn test_scroll_up_stops_following() {
        let mut app = test_app();
        app.scroll_up(3);
        assert!(!app.follow);
        assert_eq!(app.scroll, 0);

        app.scroll_down(1);
        assert!(app.follow);
    }

    #[tokio::test]
    async fn test_scroll_clamps_on_very_long_conversation() {
        let mut app = test_app();
        app.chat_width = 50;
        app.chat_height = 20;

        // 70k lines from the user, echoed back by the mock
        app.controller
            .send_message(&"x\n".repeat(70_000))
            .await
            .unwrap();

        app.scroll_to_bottom();
        assert_eq!(app.scroll, u16::MAX - 20);

        app.scroll_down(10);
        assert_eq!(app.scroll, u16::MAX - 20);
        assert!(app.follow);
    }
}
