//! Wire types for the chat server API
//!
//! Outbound types serialize to the OpenAI-style shapes the server expects;
//! inbound types are deliberately lenient (optional fields, envelope fallback)
//! because server versions disagree on response details.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Role of a turn in the transcript
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// Content of a single turn.
///
/// Serializes untagged: `Text` becomes a bare JSON string, `Parts` a JSON array.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One element of a structured message body
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// `{"type":"text","text":...}`
    Text { text: String },
    /// `{"type":"image_url","image_url":{"url":...}}`
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImageUrl {
    pub url: String,
}

/// A message sent to the chat completions endpoint
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: TurnContent,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, content: TurnContent) -> Self {
        Self { role, content }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, TurnContent::Text(text.into()))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, TurnContent::Text(text.into()))
    }

    pub fn user_with_parts(parts: Vec<ContentPart>) -> Self {
        Self::new(TurnRole::User, TurnContent::Parts(parts))
    }

    /// Compose the outgoing user turn from typed text and an optional upload.
    ///
    /// Non-empty text becomes a text part and an attachment with a URL becomes
    /// an image part. With no parts at all the turn falls back to plain text.
    pub fn pending(text: &str, attachment: Option<&UploadedAttachment>) -> Self {
        let mut parts = Vec::new();
        if !text.is_empty() {
            parts.push(ContentPart::text(text));
        }
        if let Some(url) = attachment.and_then(|a| a.url.as_deref()) {
            parts.push(ContentPart::image(url));
        }

        if parts.is_empty() {
            Self::user(text)
        } else {
            Self::user_with_parts(parts)
        }
    }
}

/// Chat completions request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ConversationTurn],
    pub stream: bool,
}

/// One `data:` frame of a streaming completion
#[derive(Debug, Clone, Deserialize)]
pub struct ChatStreamChunk {
    pub choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatStreamChoice {
    pub delta: ChatStreamDelta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatStreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatStreamChunk {
    /// Text carried by the first choice, if any and non-empty
    pub fn text_delta(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Non-streaming completion response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Sign-in response. Servers disagree on the token field name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignInResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default, rename = "accessToken")]
    pub access_token_camel: Option<String>,
}

impl SignInResponse {
    /// First non-empty of `token`, `access_token`, `accessToken`, in that order
    pub fn into_token(self) -> Option<String> {
        [self.token, self.access_token, self.access_token_camel]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub id: String,
}

impl ModelsResponse {
    /// Model ids in server order
    pub fn into_ids(self) -> Vec<String> {
        self.data.into_iter().map(|m| m.id).collect()
    }
}

/// `{"data": T}` wrapper used by some endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Decode either `{"data": T}` or a bare `T`, preferring the envelope.
pub fn decode_enveloped<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    match serde_json::from_slice::<Envelope<T>>(bytes) {
        Ok(envelope) => Ok(envelope.data),
        Err(_) => serde_json::from_slice(bytes),
    }
}

/// File record returned by the upload endpoint
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadedAttachment {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NoteItem {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MemoryItem {
    pub id: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ToolItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
