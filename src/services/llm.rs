use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PromptRequest;

/// Failures of a chat-completion call. Each one renders as a message the
/// session can show in place of the answer.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing GROQ_API_KEY. Please check your .env file.")]
    MissingCredential,
    #[error("Empty prompt received.")]
    EmptyPrompt,
    #[error("HTTPError {status}: {body}")]
    UpstreamHttp { status: u16, body: String },
    #[error("General Error: {0}")]
    General(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::General(err.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::General(format!("invalid completion response: {}", err))
    }
}

/// Chat-completion backend. One call, one answer, no retries.
#[async_trait::async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, request: &PromptRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: String,
}

/// Groq's OpenAI-compatible chat-completion endpoint.
pub struct GroqClient {
    api_key: Option<String>,
    api_url: String,
    model: String,
    client: reqwest::Client,
}

impl GroqClient {
    pub fn new(api_key: Option<String>, api_url: String, model: String) -> Self {
        Self {
            api_key,
            api_url,
            model,
            client: reqwest::Client::new(),
        }
    }

    fn build_request(&self, request: &PromptRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.persona.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    fn parse_response(body: &str) -> Result<String, LlmError> {
        let chat_response: ChatResponse = serde_json::from_str(body)?;
        chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| LlmError::General("completion response has no choices".to_string()))
    }
}

#[async_trait::async_trait]
impl Completer for GroqClient {
    async fn complete(&self, request: &PromptRequest) -> Result<String, LlmError> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                log::warn!("⚠️ GROQ_API_KEY not set, skipping completion request");
                return Err(LlmError::MissingCredential);
            }
        };

        if request.prompt.trim().is_empty() {
            log::warn!("⚠️ Refusing to send an empty prompt");
            return Err(LlmError::EmptyPrompt);
        }

        let body = self.build_request(request);
        log::info!(
            "🤖 Sending request to Groq with model: {} (max_tokens={})",
            self.model,
            request.max_tokens
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Groq response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("❌ Groq API error ({}): {}", status, error_text);
            return Err(LlmError::UpstreamHttp {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let response_text = response.text().await?;
        log::debug!("📄 Raw Groq response size: {} bytes", response_text.len());

        let content = Self::parse_response(&response_text)?;
        log::info!("✅ Received completion ({} chars)", content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fakes::{closed_port_url, serve_status};
    use axum::http::StatusCode;

    fn client(api_key: Option<&str>) -> GroqClient {
        GroqClient::new(
            api_key.map(str::to_string),
            // Unroutable: tests must never reach the network.
            "http://127.0.0.1:9/never".to_string(),
            "test_model".to_string(),
        )
    }

    #[test]
    fn test_request_puts_persona_first() {
        let request = PromptRequest::new("Is dal healthy?").with_max_tokens(250);
        let body = serde_json::to_value(client(Some("k")).build_request(&request)).unwrap();

        assert_eq!(body["model"], "test_model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Is dal healthy?");
        assert_eq!(body["max_tokens"], 250);
    }

    #[test]
    fn test_parse_response_trims_first_choice() {
        let body = r#"{"choices":[{"message":{"content":"  Dal Rice \n"}},{"message":{"content":"other"}}]}"#;
        assert_eq!(GroqClient::parse_response(body).unwrap(), "Dal Rice");
    }

    #[test]
    fn test_parse_response_without_choices() {
        let err = GroqClient::parse_response(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, LlmError::General(_)));

        let err = GroqClient::parse_response("<html>").unwrap_err();
        assert!(matches!(err, LlmError::General(_)));
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let err = client(None)
            .complete(&PromptRequest::new("Estimate calories"))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::MissingCredential));
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[tokio::test]
    async fn test_blank_prompt_is_rejected() {
        let err = client(Some("gsk_test"))
            .complete(&PromptRequest::new("  \n\t"))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::EmptyPrompt));
    }

    #[test]
    fn test_upstream_error_message() {
        let err = LlmError::UpstreamHttp {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "HTTPError 429: rate limited");
    }

    fn client_at(base_url: &str) -> GroqClient {
        GroqClient::new(
            Some("gsk_test".to_string()),
            format!("{}/openai/v1/chat/completions", base_url),
            "test_model".to_string(),
        )
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let base = serve_status(StatusCode::TOO_MANY_REQUESTS, "rate limited").await;

        let err = client_at(&base)
            .complete(&PromptRequest::new("Estimate calories in poha"))
            .await
            .unwrap_err();

        match err {
            LlmError::UpstreamHttp { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected UpstreamHttp, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_general_error() {
        let base = closed_port_url().await;

        let err = client_at(&base)
            .complete(&PromptRequest::new("Estimate calories in poha"))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::General(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_success_returns_trimmed_content() {
        let base = serve_status(
            StatusCode::OK,
            r#"{"choices":[{"message":{"content":"\n- 250 kcal\n"}}]}"#,
        )
        .await;

        let content = client_at(&base)
            .complete(&PromptRequest::new("Estimate calories in poha"))
            .await
            .unwrap();
        assert_eq!(content, "- 250 kcal");
    }
}
