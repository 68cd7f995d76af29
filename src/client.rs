//! HTTP client for the chat server API
//!
//! [`Client`] wraps one pooled `reqwest::Client` together with a snapshot of the
//! server settings and the current session token. Every operation is a single
//! `&self` async call, so independent requests (listing models while a chat is
//! streaming, for example) can run concurrently on clones of the same client.
//!
//! ## Request Flow
//!
//! ```text
//! operation(args)
//!     │
//!     ├─> ServerConfig::endpoint(path)        base URL normalization
//!     │
//!     ├─> select_credential()                 session token > API key > none
//!     │
//!     ├─> JSON / multipart body encoding
//!     │
//!     ├─> send; non-2xx → Error::Server(status, body)
//!     │
//!     └─> decode body  (or hand the byte stream to the SSE decoder)
//! ```
//!
//! Listing and upload calls go through [`first_success`] because server
//! versions disagree on the exact path; see [`endpoints`] for the order tried.
//!
//! # Examples
//!
//! ```rust,no_run
//! use conduit::{Client, ClientOptions, ConversationTurn};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = Client::new(
//!     ClientOptions::builder()
//!         .base_url("localhost:3000")
//!         .build()?,
//! )?;
//!
//! let token = client.sign_in("me@example.com", "hunter2").await?;
//! client.set_session_token(token);
//!
//! let models = client.fetch_models().await?;
//! let history = vec![ConversationTurn::user("Say hello")];
//!
//! let mut reply = String::new();
//! client
//!     .stream_chat(&history, &models[0], |delta| reply.push_str(delta))
//!     .await?;
//! println!("{}", reply);
//! # Ok(())
//! # }
//! ```

use crate::auth::{SessionCredential, apply_credential, select_credential};
use crate::config::{ClientOptions, ServerConfig};
use crate::fallback::first_success;
use crate::multipart::attachment_form;
use crate::sse::{DeltaStream, decode_stream, forward_deltas};
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, ConversationTurn, MemoryItem, ModelsResponse,
    NoteItem, SignInRequest, SignInResponse, ToolItem, UploadedAttachment, decode_enveloped,
};
use crate::{Error, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Server paths, in the order they are tried
pub mod endpoints {
    pub const SIGN_IN: &str = "/api/v1/auths/signin";
    pub const MODELS: &str = "/api/models";
    pub const CHAT_COMPLETIONS: &str = "/api/chat/completions";
    pub const UPLOAD: [&str; 2] = ["/api/v1/files/", "/api/v1/files"];
    pub const NOTES: [&str; 2] = ["/api/v1/notes", "/api/v1/notes/list"];
    pub const MEMORIES: [&str; 2] = ["/api/v1/memories", "/api/v1/memory"];
    pub const TOOLS: [&str; 2] = ["/api/v1/tools", "/api/v1/functions"];
}

const JSON_CONTENT_TYPE: &str = "application/json";
const EVENT_STREAM: &str = "text/event-stream";

// Body placeholders when an error response cannot be read
const UNKNOWN_ERROR_BODY: &str = "Unknown";
const UPLOAD_ERROR_BODY: &str = "Upload failed";
const STREAM_ERROR_BODY: &str = "Streaming request failed";

/// Client for one chat server.
///
/// Cloning is cheap: clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    server: ServerConfig,
    session: SessionCredential,
    http_client: reqwest::Client,

    /// Whole-request timeout for non-streaming calls. Streaming calls are only
    /// bounded by the connect timeout so long generations are not cut off.
    timeout: Duration,
}

impl Client {
    /// Creates a new client with the specified configuration.
    ///
    /// The base URL is not validated here; an unusable one surfaces as
    /// [`Error::InvalidConfiguration`] from the first request.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialization failure, for example).
    pub fn new(options: ClientOptions) -> Result<Self> {
        let timeout = Duration::from_secs(options.timeout);
        let http_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            server: options.server,
            session: SessionCredential::new(options.session_token),
            http_client,
            timeout,
        })
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn session(&self) -> &SessionCredential {
        &self.session
    }

    /// Use `token` for subsequent requests (typically the result of [`Client::sign_in`]).
    pub fn set_session_token(&mut self, token: impl Into<String>) {
        self.session = SessionCredential::new(token);
    }

    /// Forget the session token; requests fall back to the API key, if any.
    pub fn sign_out(&mut self) {
        self.session.sign_out();
    }

    /// Sign in with email and password and return the session token.
    ///
    /// The token is not stored; pass it to [`Client::set_session_token`].
    ///
    /// # Errors
    ///
    /// [`Error::MissingToken`] when the server accepts the credentials but the
    /// response carries none of `token`, `access_token`, `accessToken`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        let payload = SignInRequest { email, password };
        let response: SignInResponse = self
            .send_json(Method::POST, endpoints::SIGN_IN, Some(&payload))
            .await?;

        response.into_token().ok_or(Error::MissingToken)
    }

    /// List available model ids in server order.
    pub async fn fetch_models(&self) -> Result<Vec<String>> {
        let response: ModelsResponse = self.get_json(endpoints::MODELS).await?;
        Ok(response.into_ids())
    }

    /// Upload a file for use as a chat attachment.
    ///
    /// Tries `/api/v1/files/` and then `/api/v1/files`.
    pub async fn upload_attachment(
        &self,
        filename: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<UploadedAttachment> {
        first_success(
            endpoints::UPLOAD
                .map(|path| move || self.multipart_upload(path, filename, mime_type, data)),
        )
        .await
    }

    /// Start a streaming completion and return its text deltas.
    ///
    /// The HTTP status is checked before the stream is returned, so a rejected
    /// request fails here with [`Error::Server`] rather than from the stream.
    /// Dropping the stream closes the connection.
    pub async fn stream_chat_deltas(
        &self,
        messages: &[ConversationTurn],
        model: &str,
    ) -> Result<DeltaStream> {
        ensure_model(model)?;

        let payload = ChatCompletionRequest {
            model,
            messages,
            stream: true,
        };

        let response = self
            .request(Method::POST, endpoints::CHAT_COMPLETIONS)?
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, EVENT_STREAM)
            .body(serde_json::to_vec(&payload)?)
            .send()
            .await?;

        let response = check_status(response, STREAM_ERROR_BODY).await?;
        Ok(decode_stream(response.bytes_stream()))
    }

    /// Stream a completion, calling `on_delta` with each text fragment as it
    /// arrives. Returns once the server sends `[DONE]` or closes the stream.
    pub async fn stream_chat<F>(
        &self,
        messages: &[ConversationTurn],
        model: &str,
        on_delta: F,
    ) -> Result<()>
    where
        F: FnMut(&str),
    {
        let deltas = self.stream_chat_deltas(messages, model).await?;
        let delivered = forward_deltas(deltas, on_delta).await?;
        log::debug!("streamed {} deltas from {}", delivered, model);
        Ok(())
    }

    /// Non-streaming completion; returns the first choice's message text.
    pub async fn complete_chat(
        &self,
        messages: &[ConversationTurn],
        model: &str,
    ) -> Result<String> {
        ensure_model(model)?;

        let payload = ChatCompletionRequest {
            model,
            messages,
            stream: false,
        };
        let response: ChatCompletionResponse = self
            .send_json(Method::POST, endpoints::CHAT_COMPLETIONS, Some(&payload))
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(Error::InvalidResponse)
    }

    pub async fn fetch_notes(&self) -> Result<Vec<NoteItem>> {
        first_success(endpoints::NOTES.map(|path| move || self.get_json(path))).await
    }

    pub async fn fetch_memories(&self) -> Result<Vec<MemoryItem>> {
        first_success(endpoints::MEMORIES.map(|path| move || self.get_json(path))).await
    }

    pub async fn fetch_tools(&self) -> Result<Vec<ToolItem>> {
        first_success(endpoints::TOOLS.map(|path| move || self.get_json(path))).await
    }

    fn credential(&self) -> Option<&str> {
        select_credential(&self.session.token, &self.server.api_key)
    }

    /// Resolve `path`, start a request, and attach credentials.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.server.endpoint(path)?;
        log::debug!("{} {}", method, url);

        let builder = self.http_client.request(method, url);
        Ok(apply_credential(builder, self.credential()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json::<(), T>(Method::GET, path, None).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self
            .request(method, path)?
            .timeout(self.timeout)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = check_status(builder.send().await?, UNKNOWN_ERROR_BODY).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn multipart_upload(
        &self,
        path: &str,
        filename: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<UploadedAttachment> {
        let form = attachment_form(filename, mime_type, data)?;
        let response = self
            .request(Method::POST, path)?
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await?;

        let response = check_status(response, UPLOAD_ERROR_BODY).await?;
        let bytes = response.bytes().await?;
        Ok(decode_enveloped(&bytes)?)
    }
}

/// Pass 2xx responses through; turn anything else into [`Error::Server`].
async fn check_status(response: Response, placeholder: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|e| {
        log::warn!("failed to read error response body: {}", e);
        placeholder.to_string()
    });
    Err(Error::server(status.as_u16(), body))
}

fn ensure_model(model: &str) -> Result<()> {
    if model.trim().is_empty() {
        return Err(Error::config("model is required"));
    }
    Ok(())
}
