//! [`LlmDriver`] – OpenAI-compatible LLM interface.
//!
//! Talks to any model server exposing `/v1/chat/completions`, such as
//! [Ollama](https://ollama.com) (`http://localhost:11434`). Callers that need
//! structured output pass a JSON schema, which is sent as `response_format`.
//!
//! # Example
//!
//! ```rust,no_run
//! use seekdog_runtime::llm_driver::{ChatMessage, LlmDriver, Role};
//!
//! let driver = LlmDriver::new("http://localhost:11434", "llama3");
//!
//! let messages = vec![
//!     ChatMessage::system("You steer a quadruped robot."),
//!     ChatMessage::user("The banana is ahead. What next?"),
//! ];
//!
//! // Requires a running model server – skipped in unit tests.
//! // let reply = driver.complete(&messages, None).await?;
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Search guidelines
// ─────────────────────────────────────────────────────────────────────────────

/// Rules appended to every system-role message so the model keeps its moves
/// on the grid and does not oscillate.
pub const SEARCH_GUIDELINES: &str = "\
## Search Guidelines
- Only use these actions: move forward, move backward, shift right, shift left, turn right, turn left, stop.
- Every move or shift covers exactly one grid cell; every turn is exactly 90 degrees.
- Do not undo your previous action unless the memory shows it led nowhere.
- Reply with stop only when the target is directly in front of you and close.";

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from LLM driver operations.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The HTTP request to the model server failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The response from the model server could not be parsed.
    #[error("Unexpected response format: {0}")]
    BadResponse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Message types (OpenAI-compatible)
// ─────────────────────────────────────────────────────────────────────────────

/// The role of a participant in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal request / response shapes
// ─────────────────────────────────────────────────────────────────────────────

/// `response_format` field that enforces structured JSON Schema output.
#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: &'a serde_json::Value,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Append [`SEARCH_GUIDELINES`] to every system message, prepending a
/// guidelines-only system message when the conversation has none.
fn with_guidelines(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut augmented: Vec<ChatMessage> = messages
        .iter()
        .map(|m| {
            if m.role == Role::System {
                ChatMessage::system(format!("{}\n\n{}", m.content, SEARCH_GUIDELINES))
            } else {
                m.clone()
            }
        })
        .collect();

    if !augmented.iter().any(|m| m.role == Role::System) {
        augmented.insert(0, ChatMessage::system(SEARCH_GUIDELINES));
    }
    augmented
}

// ─────────────────────────────────────────────────────────────────────────────
// LlmDriver
// ─────────────────────────────────────────────────────────────────────────────

/// An async client for an OpenAI-compatible chat-completions endpoint.
///
/// Construct once and share across rounds; the inner HTTP client pools
/// connections.
#[derive(Debug, Clone)]
pub struct LlmDriver {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl LlmDriver {
    /// Create a new driver pointing at `base_url` (e.g. `"http://localhost:11434"`)
    /// and using `model` (e.g. `"llama3"`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `messages` to the model and return the assistant's reply text.
    ///
    /// [`SEARCH_GUIDELINES`] are appended to every [`Role::System`] message.
    /// When `schema` is given it is sent as a `json_schema` response format.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the request fails, or
    /// [`LlmError::BadResponse`] if the response shape is unexpected.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        schema: Option<&serde_json::Value>,
    ) -> Result<String, LlmError> {
        let augmented = with_guidelines(messages);
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: &augmented,
            stream: false,
            response_format: schema.map(|json_schema| ResponseFormat {
                kind: "json_schema",
                json_schema,
            }),
        };

        debug!(model = %self.model, messages = augmented.len(), "chat completion request");
        let response: ChatResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::BadResponse("empty choices array".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_role_variants_serialize() {
        let roles = [
            (Role::System, "system"),
            (Role::User, "user"),
            (Role::Assistant, "assistant"),
        ];
        for (role, expected) in roles {
            let msg = ChatMessage {
                role,
                content: String::new(),
            };
            let json = serde_json::to_string(&msg).unwrap();
            assert!(json.contains(expected));
        }
    }

    #[test]
    fn guidelines_are_appended_to_system_message() {
        let augmented = with_guidelines(&[
            ChatMessage::system("You steer a robot."),
            ChatMessage::user("next?"),
        ]);
        assert_eq!(augmented.len(), 2);
        assert!(augmented[0].content.starts_with("You steer a robot."));
        assert!(augmented[0].content.contains("Search Guidelines"));
        assert_eq!(augmented[1].content, "next?");
    }

    #[test]
    fn guidelines_prepended_when_no_system_message() {
        let augmented = with_guidelines(&[ChatMessage::user("What should I do?")]);
        assert_eq!(augmented.len(), 2);
        assert_eq!(augmented[0].role, Role::System);
        assert!(augmented[0].content.contains("Search Guidelines"));
    }

    #[test]
    fn request_omits_response_format_without_schema() {
        let messages = [ChatMessage::user("hi")];
        let body = ChatRequest {
            model: "llama3",
            messages: &messages,
            stream: false,
            response_format: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("response_format").is_none());
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn request_carries_schema_when_given() {
        let schema = serde_json::json!({"type": "object"});
        let messages = [ChatMessage::user("hi")];
        let body = ChatRequest {
            model: "llama3",
            messages: &messages,
            stream: false,
            response_format: Some(ResponseFormat {
                kind: "json_schema",
                json_schema: &schema,
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["type"], "object");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let driver = LlmDriver::new("http://localhost:11434/", "llama3");
        assert_eq!(driver.base_url, "http://localhost:11434");
        assert_eq!(driver.model(), "llama3");
    }
}
