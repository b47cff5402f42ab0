use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::provider::ResponseProvider;
use crate::state::{ChatMessage, Message};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

/// Chat-completion client for OpenAI-compatible endpoints
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send the whole history and return the first choice's text
    pub async fn query(&self, history: &[Message]) -> Result<String, ProviderError> {
        let request = OpenAIRequest {
            model: &self.model,
            messages: history.iter().map(Message::to_chat_message).collect(),
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(%url, messages = request.messages.len(), "sending chat completion");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::debug!(%status, body = %text, "chat completion rejected");
            return Err(ProviderError::status(status));
        }

        let body = response.text().await?;
        let openai_response: OpenAIResponse = serde_json::from_str(&body)?;

        openai_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[async_trait]
impl ResponseProvider for OpenAIClient {
    async fn complete(&self, history: &[Message]) -> Result<String, ProviderError> {
        self.query(history).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> OpenAIClient {
        OpenAIClient::new("test-key", DEFAULT_MODEL)
            .unwrap()
            .with_base_url(&server.uri())
    }

    fn history() -> Vec<Message> {
        vec![
            Message::system("You are a helpful assistant."),
            Message::user("What is Rust?"),
        ]
    }

    #[tokio::test]
    async fn test_query_returns_first_choice() {
        let mock_server = MockServer::start().await;

        let response_json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "A systems language."}},
                {"message": {"role": "assistant", "content": "Ignored."}}
            ]
        }"#;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(response_json))
            .expect(1)
            .mount(&mock_server)
            .await;

        let reply = test_client(&mock_server).query(&history()).await.unwrap();
        assert_eq!(reply, "A systems language.");
    }

    #[tokio::test]
    async fn test_query_sends_full_history() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": DEFAULT_MODEL,
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant."},
                    {"role": "user", "content": "What is Rust?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "ok"}}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let reply = test_client(&mock_server).query(&history()).await.unwrap();
        assert_eq!(reply, "ok");
    }

    #[tokio::test]
    async fn test_non_success_status_reports_code_and_reason() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let err = test_client(&mock_server).query(&history()).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("500"), "got: {}", text);
        assert!(text.contains("Internal Server Error"), "got: {}", text);
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"choices": []}"#))
            .mount(&mock_server)
            .await;

        let err = test_client(&mock_server).query(&history()).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
        assert_eq!(err.to_string(), "No response from AI");
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let err = test_client(&mock_server).query(&history()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
        assert!(err.to_string().starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = OpenAIClient::new("test-key", DEFAULT_MODEL)
            .unwrap()
            .with_base_url("http://127.0.0.1:1");

        let err = client.query(&history()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OpenAIClient::new("k", "m")
            .unwrap()
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
        assert_eq!(client.model(), "m");
    }
}
