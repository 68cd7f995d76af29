//! Error types for the Conduit client

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the client
///
/// Every variant renders a human-readable message through `Display`, which is
/// what applications are expected to surface to their users.
#[derive(Error, Debug)]
pub enum Error {
    /// Base URL (or another required setting) is missing or unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Transport finished but did not yield a usable HTTP response
    #[error("Invalid server response")]
    InvalidResponse,

    /// Server answered with a status outside 200-299
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    /// Sign-in succeeded but none of the known token fields was populated
    #[error("No auth token returned by server")]
    MissingToken,

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfiguration(msg.into())
    }

    /// Create a new server error from a status code and response body
    pub fn server(status: u16, body: impl Into<String>) -> Self {
        Error::Server {
            status,
            body: body.into(),
        }
    }

    /// HTTP status carried by a [`Error::Server`], if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
