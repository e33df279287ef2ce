//! Chat completion proxy.
//!
//! The front-end posts `{ "messages": [{ "role", "content" }, ...],
//! "systemPrompt": "..." }` and receives `{ "content": "..." }` or
//! `{ "error": "..." }`.  [`Proxy`] validates the request, builds the
//! upstream payload with the API key that only the server knows, and maps
//! the upstream answer back.  The HTTP transport itself is supplied by a
//! [`ChatBackend`].

use std::fmt;
use config::{Config, Environment};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

/// Reply used when the upstream answer carries no message.
pub const FALLBACK_REPLY: &str = "I could not generate a response.";

/// Errors of the chat proxy.  Each maps to an HTTP status with
/// [`ChatError::status`].
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("OPENAI_API_KEY is not set on the server.")]
    MissingApiKey,

    #[error("Invalid JSON body")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Body must include messages (array) and systemPrompt (string).")]
    InvalidBody,

    /// The completion API answered with a non-success status.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// The completion API answered with a body that is not a completion.
    #[error("Invalid response from the completion API: {0}")]
    UpstreamBody(#[source] serde_json::Error),

    /// The request could not be delivered.
    #[error("{0}")]
    Transport(String),

    #[error("Invalid proxy configuration: {0}")]
    Config(#[from] config::ConfigError),
}

impl ChatError {
    /// HTTP status code reported to the client.
    pub fn status(&self) -> u16 {
        match self {
            ChatError::MethodNotAllowed => 405,
            ChatError::InvalidJson(_) | ChatError::InvalidBody => 400,
            ChatError::Upstream { status, .. } => *status,
            ChatError::MissingApiKey | ChatError::UpstreamBody(_)
            | ChatError::Transport(_) | ChatError::Config(_) => 500,
        }
    }
}

/// One message of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// `system`, `user` or `assistant`.
    pub role: String,
    /// Forwarded as received.
    pub content: Value,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Message { role: role.into(), content: Value::String(content.into()) }
    }

    fn is_conversation(&self) -> bool {
        matches!(self.role.as_str(), "user" | "assistant")
    }
}

/// Body of a chat request from the front-end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user and assistant turns.  Entries with any other role, or no
    /// role at all, are dropped whatever their shape.
    #[serde(deserialize_with = "conversation")]
    pub messages: Vec<Message>,
    pub system_prompt: String,
}

impl ChatRequest {
    /// Parse and validate a request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ChatError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(ChatError::InvalidJson)?;
        let request: ChatRequest = serde_json::from_value(value)
            .map_err(|_| ChatError::InvalidBody)?;
        if request.system_prompt.is_empty() { return Err(ChatError::InvalidBody) }
        Ok(request)
    }
}

fn conversation<'de, D>(deserializer: D) -> Result<Vec<Message>, D::Error>
where D: Deserializer<'de> {
    let entries = Vec::<Value>::deserialize(deserializer)?;
    Ok(entries.into_iter().filter_map(|mut entry| {
        let role = match entry.get("role")?.as_str()? {
            r @ ("user" | "assistant") => r.to_owned(),
            _ => return None,
        };
        let content = entry.get_mut("content").map(Value::take)
            .unwrap_or_default();
        Some(Message { role, content })
    }).collect())
}

/// Body of the answer to the front-end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatReply {
    Content(String),
    Error(String),
}

impl ChatReply {
    /// The JSON body, e.g. `{"content":"..."}`.
    pub fn to_json(&self) -> String {
        // A map with a single string value always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Upstream completion parameters and credentials.
///
/// Loaded from the environment with [`ProxyConfig::from_env`]:
/// `OPENAI_API_KEY`, `CHAT_MODEL`, `CHAT_TEMPERATURE`, `CHAT_TOP_P`,
/// `CHAT_PRESENCE_PENALTY`, `CHAT_FREQUENCY_PENALTY`, `CHAT_MAX_TOKENS`
/// and `CHAT_ENDPOINT`.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    #[serde(rename = "openai_api_key")]
    pub api_key: String,
    #[serde(rename = "chat_model")]
    pub model: String,
    #[serde(rename = "chat_temperature")]
    pub temperature: f64,
    #[serde(rename = "chat_top_p")]
    pub top_p: f64,
    #[serde(rename = "chat_presence_penalty")]
    pub presence_penalty: f64,
    #[serde(rename = "chat_frequency_penalty")]
    pub frequency_penalty: f64,
    #[serde(rename = "chat_max_tokens")]
    pub max_tokens: u32,
    #[serde(rename = "chat_endpoint")]
    pub endpoint: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            api_key: String::new(),
            model: "gpt-4o".to_owned(),
            temperature: 0.3,
            top_p: 1.,
            presence_penalty: 0.,
            frequency_penalty: 0.,
            max_tokens: 600,
            endpoint: "https://api.openai.com/v1/chat/completions".to_owned(),
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key().is_some() { "<redacted>" } else { "<unset>" };
        f.debug_struct("ProxyConfig")
            .field("api_key", &key)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("presence_penalty", &self.presence_penalty)
            .field("frequency_penalty", &self.frequency_penalty)
            .field("max_tokens", &self.max_tokens)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ProxyConfig {
    /// Load the configuration from the process environment.  Unset
    /// variables keep their [`Default`] value.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_environment(Environment::default())
    }

    /// Load the configuration from an explicit environment source.
    pub fn from_environment(env: Environment) -> Result<Self, ChatError> {
        let config = Config::builder()
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// The API key with surrounding whitespace removed, if not blank.
    pub fn api_key(&self) -> Option<&str> {
        let key = self.api_key.trim();
        if key.is_empty() { None } else { Some(key) }
    }
}

/// Payload sent to the completion API.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

impl CompletionRequest {
    /// The system prompt followed by the user and assistant messages of
    /// `request`, in order.
    pub fn new(config: &ProxyConfig, request: ChatRequest) -> Self {
        let ChatRequest { messages, system_prompt } = request;
        let messages = std::iter::once(Message::new("system", system_prompt))
            .chain(messages.into_iter().filter(Message::is_conversation))
            .collect();
        CompletionRequest {
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            presence_penalty: config.presence_penalty,
            frequency_penalty: config.frequency_penalty,
            max_tokens: config.max_tokens,
            messages,
        }
    }
}

/// Raw answer of the completion API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl UpstreamResponse {
    /// The generated text, or the error the client should see.
    pub fn into_content(self) -> Result<String, ChatError> {
        if !(200 .. 300).contains(&self.status) {
            let message = serde_json::from_str::<ErrorBody>(&self.body).ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("OpenAI error ({})", self.status));
            return Err(ChatError::Upstream { status: self.status, message })
        }
        let body: CompletionBody = serde_json::from_str(&self.body)
            .map_err(ChatError::UpstreamBody)?;
        Ok(body.choices.into_iter().next()
           .and_then(|c| c.message)
           .and_then(|m| m.content)
           .unwrap_or_else(|| FALLBACK_REPLY.to_owned()))
    }
}

/// Transport to the completion API.
pub trait ChatBackend {
    /// POST `request` as JSON to `endpoint`, authenticated with the bearer
    /// token `api_key`.
    fn complete(&self, endpoint: &str, api_key: &str,
                request: &CompletionRequest)
                -> Result<UpstreamResponse, ChatError>;
}

/// Translates front-end chat requests into completion API calls.
#[derive(Debug)]
pub struct Proxy<B> {
    config: ProxyConfig,
    backend: B,
}

impl<B: ChatBackend> Proxy<B> {
    pub fn new(config: ProxyConfig, backend: B) -> Self {
        Proxy { config, backend }
    }

    pub fn config(&self) -> &ProxyConfig { &self.config }

    /// Forward a validated request and return the generated text.
    pub fn chat(&self, request: ChatRequest) -> Result<String, ChatError> {
        let api_key = self.config.api_key().ok_or(ChatError::MissingApiKey)?;
        let payload = CompletionRequest::new(&self.config, request);
        info!(model = %payload.model, messages = payload.messages.len(),
              "forwarding chat request");
        let response = self.backend.complete(&self.config.endpoint, api_key,
                                             &payload)?;
        response.into_content()
    }

    /// Handle an HTTP request to the chat endpoint: return the status
    /// code and the reply body.
    pub fn handle(&self, method: &str, body: &[u8]) -> (u16, ChatReply) {
        match self.try_handle(method, body) {
            Ok(content) => (200, ChatReply::Content(content)),
            Err(err) => {
                let status = err.status();
                warn!(status, error = %err, "chat request failed");
                let message = match err.to_string() {
                    m if m.is_empty() => "Request failed.".to_owned(),
                    m => m,
                };
                (status, ChatReply::Error(message))
            }
        }
    }

    fn try_handle(&self, method: &str, body: &[u8]) -> Result<String, ChatError> {
        if !method.eq_ignore_ascii_case("POST") {
            return Err(ChatError::MethodNotAllowed)
        }
        if self.config.api_key().is_none() { return Err(ChatError::MissingApiKey) }
        let request = ChatRequest::from_slice(body)?;
        self.chat(request)
    }
}
