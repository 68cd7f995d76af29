//! # Conduit - Rust client for Open WebUI-compatible chat servers
//!
//! An async, streaming-first client for chat servers that speak the Open WebUI
//! REST + Server-Sent Events API.
//!
//! ## Overview
//!
//! - **Streaming chat**: text deltas delivered as they arrive, via a callback or a `Stream`
//! - **Listing**: models, notes, memories and tools
//! - **Auth**: email/password sign-in, session token with API key fallback
//! - **Attachments**: single-file multipart upload
//! - **Version tolerance**: ordered fallback across the endpoint paths different
//!   server releases use
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conduit::{Client, ClientOptions, ConversationTurn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(
//!         ClientOptions::builder()
//!             .base_url("http://localhost:3000")
//!             .api_key("sk-...")
//!             .build()?,
//!     )?;
//!
//!     let history = vec![ConversationTurn::user("What's the capital of France?")];
//!     client
//!         .stream_chat(&history, "llama3.1", |delta| print!("{}", delta))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Consuming a delta stream
//!
//! ```rust,no_run
//! use conduit::{Client, ClientOptions, ConversationTurn};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new(ClientOptions::builder().base_url("localhost:3000").build()?)?;
//! let history = vec![ConversationTurn::user("Tell me a joke")];
//!
//! let mut deltas = client.stream_chat_deltas(&history, "llama3.1").await?;
//! while let Some(delta) = deltas.next().await {
//!     print!("{}", delta?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **client**: the API operations over a shared `reqwest::Client`
//! - **config**: server settings, base URL normalization, client options
//! - **auth**: session token / API key selection and header emission
//! - **types**: request and response bodies, including tagged message content
//! - **fallback**: ordered first-success execution across endpoint variants
//! - **sse**: incremental Server-Sent Events decoding into text deltas
//! - **multipart**: single-file upload form construction
//! - **error**: error taxonomy and `Result` alias

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

/// API operations: sign-in, listing, upload and chat completions.
mod client;

/// Server configuration, endpoint resolution and client options.
mod config;

/// Error types and the crate-wide `Result` alias.
mod error;

/// Credential selection and auth header emission.
mod auth;

/// Request and response bodies for the server API.
mod types;

/// Multipart forms for attachment upload.
mod multipart;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

/// Ordered fallback across equivalent requests.
/// Public so callers can reuse it for their own version-dependent calls.
pub mod fallback;

/// Server-Sent Events decoding.
/// Public so callers can decode event streams obtained some other way.
pub mod sse;

// --- Client API ---

pub use client::{Client, endpoints};

// --- Configuration ---

pub use config::{
    ClientOptions, ClientOptionsBuilder, DEFAULT_BASE_URL, ServerConfig, get_api_key,
    get_base_url,
};

// --- Auth ---

pub use auth::{API_KEY_HEADER, SessionCredential, select_credential};

// --- Error Handling ---

pub use error::{Error, Result};

// --- Core Types ---

pub use types::{
    ContentPart, ConversationTurn, ImageUrl, MemoryItem, NoteItem, ToolItem, TurnContent,
    TurnRole, UploadedAttachment,
};

pub use multipart::attachment_form;

pub use sse::DeltaStream;

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// Convenience module containing the most commonly used types.
/// Import with `use conduit::prelude::*;`.
pub mod prelude {
    pub use crate::{
        Client, ClientOptions, ContentPart, ConversationTurn, DeltaStream, Error, Result,
        ServerConfig, TurnContent, TurnRole, UploadedAttachment,
    };
}
