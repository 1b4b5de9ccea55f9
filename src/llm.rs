//! Completion client
//!
//! This module handles communication with the chat-completions API that turns
//! transcripts into structured entries and answers history questions.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prompts::Prompt;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const OPENAI_MODEL: &str = "gpt-4o-mini";

/// Low temperature for parsing calls - favor determinism
pub const PARSE_TEMPERATURE: f32 = 0.2;
/// Higher temperature for conversational answers
pub const CHAT_TEMPERATURE: f32 = 0.7;
/// Token cap for chat answers; parsing replies are left uncapped
pub const CHAT_MAX_TOKENS: u32 = 800;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API key was rejected")]
  InvalidApiKey,

  #[error("Rate limited - wait a moment and try again")]
  RateLimited,

  #[error("API error: {0}")]
  Api(String),

  #[error("Malformed completion response: {0}")]
  MalformedResponse(String),
}

/// ---------------------------------------------------------------------------
/// Completion Contract
/// ---------------------------------------------------------------------------

/// One completion call: the prompt pair plus the knobs that differ between
/// parsing and chat.
#[derive(Debug, Clone)]
pub struct CompletionCall {
  pub prompt: Prompt,
  pub json_response: bool,
  pub temperature: f32,
  pub max_tokens: Option<u32>,
}

impl CompletionCall {
  /// Structured-output parsing call: JSON mode, low temperature, no cap
  pub fn parse(prompt: Prompt) -> Self {
    Self {
      prompt,
      json_response: true,
      temperature: PARSE_TEMPERATURE,
      max_tokens: None,
    }
  }

  /// Conversational call: free text, higher temperature, capped length
  pub fn chat(prompt: Prompt) -> Self {
    Self {
      prompt,
      json_response: false,
      temperature: CHAT_TEMPERATURE,
      max_tokens: Some(CHAT_MAX_TOKENS),
    }
  }
}

/// The seam the service depends on, so tests can substitute a canned client
/// and assert on call counts.
pub trait CompletionApi {
  fn complete(
    &self,
    api_key: &str,
    call: &CompletionCall,
  ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send;
}

/// ---------------------------------------------------------------------------
/// Chat Completion API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
  model: String,
  messages: Vec<ChatMessage>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
  role: String,
  content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")]
  format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
  error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Client
/// ---------------------------------------------------------------------------

pub struct OpenAiClient {
  client: Client,
  base_url: String,
  model: String,
}

impl OpenAiClient {
  pub fn new() -> Self {
    Self {
      client: Client::new(),
      base_url: OPENAI_API_URL.to_string(),
      model: OPENAI_MODEL.to_string(),
    }
  }

  /// Point the client at a different endpoint (tests use a local mock server)
  pub fn with_base_url(base_url: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      base_url: base_url.into(),
      model: OPENAI_MODEL.to_string(),
    }
  }
}

impl Default for OpenAiClient {
  fn default() -> Self {
    Self::new()
  }
}

impl CompletionApi for OpenAiClient {
  /// One network call per invocation; retry policy belongs to the caller
  async fn complete(&self, api_key: &str, call: &CompletionCall) -> Result<String, LlmError> {
    let request = ChatRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessage {
          role: "system".to_string(),
          content: call.prompt.system.clone(),
        },
        ChatMessage {
          role: "user".to_string(),
          content: call.prompt.user.clone(),
        },
      ],
      temperature: call.temperature,
      max_tokens: call.max_tokens,
      response_format: call.json_response.then(|| ResponseFormat {
        format_type: "json_object".to_string(),
      }),
    };

    let response = self
      .client
      .post(format!("{}/chat/completions", self.base_url))
      .bearer_auth(api_key)
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    match status {
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(LlmError::InvalidApiKey),
      StatusCode::TOO_MANY_REQUESTS => return Err(LlmError::RateLimited),
      s if !s.is_success() => {
        // Surface the API's own message where it provides one
        if let Ok(error_resp) = serde_json::from_str::<ApiErrorResponse>(&body) {
          return Err(LlmError::Api(error_resp.error.message));
        }
        return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
      }
      _ => {}
    }

    let completion: ChatResponse = serde_json::from_str(&body)
      .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

    completion
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .ok_or_else(|| LlmError::MalformedResponse("no message content in reply".to_string()))
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  fn prompt() -> Prompt {
    Prompt {
      system: "You are a test".to_string(),
      user: "hello".to_string(),
    }
  }

  fn reply_body(content: &str) -> String {
    serde_json::json!({
      "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
  }

  #[tokio::test]
  async fn test_complete_returns_first_choice_content() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/chat/completions")
      .match_header("authorization", "Bearer test-key")
      .with_status(200)
      .with_body(reply_body("{\"workouts\": []}"))
      .create_async()
      .await;

    let client = OpenAiClient::with_base_url(server.url());
    let result = client
      .complete("test-key", &CompletionCall::parse(prompt()))
      .await
      .unwrap();

    assert_eq!(result, "{\"workouts\": []}");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_parse_call_requests_json_mode() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/chat/completions")
      .match_body(mockito::Matcher::PartialJsonString(
        r#"{"response_format": {"type": "json_object"}}"#.to_string(),
      ))
      .with_status(200)
      .with_body(reply_body("{}"))
      .create_async()
      .await;

    let client = OpenAiClient::with_base_url(server.url());
    client
      .complete("test-key", &CompletionCall::parse(prompt()))
      .await
      .unwrap();
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_unauthorized_maps_to_invalid_key() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/chat/completions")
      .with_status(401)
      .with_body(r#"{"error": {"message": "bad key"}}"#)
      .create_async()
      .await;

    let client = OpenAiClient::with_base_url(server.url());
    let err = client
      .complete("bad-key", &CompletionCall::parse(prompt()))
      .await
      .unwrap_err();
    assert!(matches!(err, LlmError::InvalidApiKey));
  }

  #[tokio::test]
  async fn test_rate_limit_maps_to_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/chat/completions")
      .with_status(429)
      .with_body("slow down")
      .create_async()
      .await;

    let client = OpenAiClient::with_base_url(server.url());
    let err = client
      .complete("test-key", &CompletionCall::chat(prompt()))
      .await
      .unwrap_err();
    assert!(matches!(err, LlmError::RateLimited));
  }

  #[tokio::test]
  async fn test_server_error_surfaces_api_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/chat/completions")
      .with_status(500)
      .with_body(r#"{"error": {"message": "model overloaded"}}"#)
      .create_async()
      .await;

    let client = OpenAiClient::with_base_url(server.url());
    let err = client
      .complete("test-key", &CompletionCall::parse(prompt()))
      .await
      .unwrap_err();
    match err {
      LlmError::Api(message) => assert_eq!(message, "model overloaded"),
      other => panic!("expected Api error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_missing_content_is_malformed_response() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/chat/completions")
      .with_status(200)
      .with_body(r#"{"choices": []}"#)
      .create_async()
      .await;

    let client = OpenAiClient::with_base_url(server.url());
    let err = client
      .complete("test-key", &CompletionCall::parse(prompt()))
      .await
      .unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
  }
}
