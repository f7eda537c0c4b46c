//! Blocking HTTP client for a local Ollama server.
//!
//! Exposes the three endpoints this crate needs — `/api/chat` with tool
//! declarations (structured extraction), `/api/generate` (free-text
//! generation), and `/api/tags` (installed models) — behind the `LlmClient`
//! trait so every caller can be driven by a mock in tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ──────────────────────────────────────────────
// Sampling options
// ──────────────────────────────────────────────

/// Generation parameters forwarded to Ollama.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOptions {
    /// Sampling temperature. 0.0 = most deterministic.
    pub temperature: f32,
    /// Top-p (nucleus) sampling threshold. None = model default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Maximum tokens in the generated response. None = model default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
    /// Context window size. None = model default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
}

impl GenerationOptions {
    /// Pinned-deterministic options for schema-bound tool calls.
    pub fn deterministic() -> Self {
        Self {
            temperature: 0.0,
            top_p: None,
            num_predict: None,
            num_ctx: None,
        }
    }

    /// Creative options for narrative generation.
    pub fn creative() -> Self {
        Self {
            temperature: 0.8,
            top_p: None,
            num_predict: None,
            num_ctx: None,
        }
    }
}

// ──────────────────────────────────────────────
// Chat wire types (POST /api/chat)
// ──────────────────────────────────────────────

/// A single message in a chat request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A callable declared to the model alongside the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

/// The function half of a tool declaration.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the arguments object.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Declare a function-type tool.
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// Request body for POST `/api/chat` (non-streaming).
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
}

/// Response body from POST `/api/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub message: AssistantMessage,
}

/// The assistant message in a chat response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: String,
    /// Tool invocations the model requested. Absent when it answered in text.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// One requested tool invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

/// The function half of a requested invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Arguments as the model produced them. Normally a JSON object; some
    /// models emit a string containing JSON instead.
    #[serde(default)]
    pub arguments: Value,
}

// ──────────────────────────────────────────────
// Generate / tags wire types
// ──────────────────────────────────────────────

/// Request body for POST `/api/generate`.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a GenerationOptions>,
}

/// Response body from POST `/api/generate`.
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Response body from GET `/api/tags`.
#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

// ──────────────────────────────────────────────
// Error taxonomy
// ──────────────────────────────────────────────

/// Errors from talking to the model server. Messages are complete
/// sentences fit to show an end user.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Ollama is not running at {0} — start Ollama and try again")]
    Connection(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Ollama returned an error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not parse the model server's response: {0}")]
    Decode(String),
}

// ──────────────────────────────────────────────
// LlmClient trait
// ──────────────────────────────────────────────

/// Seam between the extraction/generation logic and the HTTP transport.
pub trait LlmClient {
    /// One non-streaming chat round trip, with any declared tools.
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;

    /// One non-streaming completion; returns the generated text.
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<String, ClientError>;

    /// Names of the models installed on the server.
    fn list_models(&self) -> Result<Vec<String>, ClientError>;

    /// Whether `model` is installed (prefix match, so a bare name matches
    /// any tag).
    fn is_model_available(&self, model: &str) -> Result<bool, ClientError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(model)))
    }
}

/// Shared handles count as clients, so a test can keep one side of an
/// `Arc<MockLlmClient>` and hand the other to the code under test.
impl<T: LlmClient + ?Sized> LlmClient for std::sync::Arc<T> {
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        (**self).chat(request)
    }

    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<String, ClientError> {
        (**self).generate(model, prompt, system, options)
    }

    fn list_models(&self) -> Result<Vec<String>, ClientError> {
        (**self).list_models()
    }
}

// ──────────────────────────────────────────────
// OllamaClient
// ──────────────────────────────────────────────

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a new client pointing at a local Ollama instance.
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    /// Default Ollama instance at localhost:11434 with 5-minute timeout.
    pub fn default_local() -> Self {
        Self::new("http://localhost:11434", 300)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_connect() {
            ClientError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ClientError::Timeout(self.timeout_secs)
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

impl LlmClient for OllamaClient {
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<String, ClientError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
            options: Some(options),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        Ok(parsed.response)
    }

    fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TagsResponse = response
            .json()
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

// ──────────────────────────────────────────────
// Security validators
// ──────────────────────────────────────────────

/// Check that a base URL points to localhost only.
///
/// Patient narratives never leave the machine through this client.
/// Accepts localhost, 127.0.0.1, and [::1]; rejects every other host and
/// malformed URLs.
pub fn validate_base_url(url: &str) -> bool {
    let after_scheme = match url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
    {
        Some(rest) => rest,
        None => return false,
    };

    // Handle IPv6 bracket notation: [::1]
    let host = if after_scheme.starts_with('[') {
        after_scheme
            .split(']')
            .next()
            .unwrap_or("")
            .trim_start_matches('[')
    } else {
        after_scheme
            .split(':')
            .next()
            .unwrap_or("")
            .split('/')
            .next()
            .unwrap_or("")
    };

    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Check a model name against the Ollama naming convention.
///
/// Blocks path traversal and shell metacharacters before any HTTP call.
/// Format: `[namespace/]model[:tag]`, each segment starting alphanumeric,
/// at most one `/`.
pub fn validate_model_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    let valid = regex::Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9._-]*(/[a-zA-Z0-9][a-zA-Z0-9._-]*)?(:[a-zA-Z0-9._-]+)?$",
    )
    .expect("static regex");

    valid.is_match(name)
}

// ──────────────────────────────────────────────
// Mock client for tests
// ──────────────────────────────────────────────

/// Mock LLM client — serves queued canned outcomes and records every
/// request it receives, so tests can assert on the exact wire payload.
#[derive(Default)]
pub struct MockLlmClient {
    chat_queue: Mutex<VecDeque<Result<ChatResponse, ClientError>>>,
    generate_queue: Mutex<VecDeque<Result<String, ClientError>>>,
    available_models: Vec<String>,
    /// Every chat request seen, in order.
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    /// Every generate call seen, as (model, prompt, system, temperature).
    pub generate_requests: Mutex<Vec<(String, String, String, f32)>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            available_models: vec!["llama3.1:8b".to_string()],
            ..Self::default()
        }
    }

    pub fn with_chat_response(self, response: ChatResponse) -> Self {
        self.chat_queue
            .lock()
            .expect("mock lock")
            .push_back(Ok(response));
        self
    }

    pub fn with_chat_error(self, error: ClientError) -> Self {
        self.chat_queue
            .lock()
            .expect("mock lock")
            .push_back(Err(error));
        self
    }

    pub fn with_generate_response(self, text: &str) -> Self {
        self.generate_queue
            .lock()
            .expect("mock lock")
            .push_back(Ok(text.to_string()));
        self
    }

    pub fn with_generate_error(self, error: ClientError) -> Self {
        self.generate_queue
            .lock()
            .expect("mock lock")
            .push_back(Err(error));
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    /// A chat response whose assistant message requests `name(arguments)`.
    pub fn tool_call_response(name: &str, arguments: Value) -> ChatResponse {
        ChatResponse {
            message: AssistantMessage {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    function: FunctionCall {
                        name: name.to_string(),
                        arguments,
                    },
                }],
            },
        }
    }

    /// A chat response with plain text and no tool calls.
    pub fn text_response(content: &str) -> ChatResponse {
        ChatResponse {
            message: AssistantMessage {
                content: content.to_string(),
                tool_calls: Vec::new(),
            },
        }
    }
}

impl LlmClient for MockLlmClient {
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        self.chat_requests
            .lock()
            .expect("mock lock")
            .push(request.clone());
        self.chat_queue
            .lock()
            .expect("mock lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(ClientError::Network(
                    "mock: no queued chat response".to_string(),
                ))
            })
    }

    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<String, ClientError> {
        self.generate_requests.lock().expect("mock lock").push((
            model.to_string(),
            prompt.to_string(),
            system.to_string(),
            options.temperature,
        ));
        self.generate_queue
            .lock()
            .expect("mock lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(ClientError::Network(
                    "mock: no queued generate response".to_string(),
                ))
            })
    }

    fn list_models(&self) -> Result<Vec<String>, ClientError> {
        Ok(self.available_models.clone())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
