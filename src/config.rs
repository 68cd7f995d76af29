//! Server configuration and endpoint resolution
//!
//! [`ServerConfig`] holds what the user typed into their settings screen: a base
//! address (scheme optional) and a static API key. Every request resolves its
//! absolute URL through [`ServerConfig::endpoint`], so a bad base address surfaces
//! as [`Error::InvalidConfiguration`] at call time rather than at construction.
//!
//! # Examples
//!
//! ```rust
//! use conduit::ServerConfig;
//!
//! let config = ServerConfig::new("chat.example.com:3000", "");
//! let url = config.endpoint("/api/models").unwrap();
//! assert_eq!(url.as_str(), "http://chat.example.com:3000/api/models");
//! ```

use crate::{Error, Result};
use reqwest::Url;
use std::env;

/// Base URL used when neither the caller nor the environment provides one
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Environment variable consulted by [`get_base_url`]
pub const BASE_URL_ENV: &str = "CONDUIT_BASE_URL";

/// Environment variable consulted by [`get_api_key`]
pub const API_KEY_ENV: &str = "CONDUIT_API_KEY";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for one chat server
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// Base address as entered by the user; may lack a scheme
    pub base_url: String,

    /// Static API key, empty when not configured
    pub api_key: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl ServerConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Build a config from `CONDUIT_BASE_URL` / `CONDUIT_API_KEY`
    pub fn from_env() -> Self {
        Self::new(get_base_url(None), get_api_key())
    }

    /// Parse the base address into an absolute URL.
    ///
    /// Surrounding whitespace is trimmed and `http` is assumed when no scheme is
    /// given. Explicit schemes are kept as-is.
    pub fn normalized_base_url(&self) -> Result<Url> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(Error::config("base URL is empty"));
        }

        let with_scheme = if has_scheme(trimmed) {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| Error::config(format!("cannot parse base URL '{}': {}", trimmed, e)))?;

        if url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "base URL '{}' cannot carry a path",
                trimmed
            )));
        }

        Ok(url)
    }

    /// Resolve `path` against the normalized base URL.
    ///
    /// The base URL's own path is kept as a prefix, and a trailing slash on
    /// `path` survives (some servers only route `/api/v1/files/`).
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.normalized_base_url()?;
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        Ok(url)
    }
}

/// True when `s` starts with `<scheme>://`
fn has_scheme(s: &str) -> bool {
    match s.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Get the base URL from environment variable or fallback
///
/// Priority:
/// 1. CONDUIT_BASE_URL environment variable
/// 2. fallback parameter
/// 3. [`DEFAULT_BASE_URL`]
pub fn get_base_url(fallback: Option<&str>) -> String {
    resolve_base_url(env::var(BASE_URL_ENV).ok(), fallback)
}

/// Get the API key from the CONDUIT_API_KEY environment variable, empty if unset
pub fn get_api_key() -> String {
    env::var(API_KEY_ENV).unwrap_or_default()
}

fn resolve_base_url(from_env: Option<String>, fallback: Option<&str>) -> String {
    from_env
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| fallback.unwrap_or(DEFAULT_BASE_URL).to_string())
}

/// Options for constructing a [`Client`](crate::Client)
#[derive(Clone)]
pub struct ClientOptions {
    /// Server address and static API key
    pub server: ServerConfig,

    /// Session token from a previous sign-in, empty if none
    pub session_token: String,

    /// Request timeout in seconds for non-streaming calls
    pub timeout: u64,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("server", &self.server)
            .field("session_token", &if self.session_token.is_empty() { "" } else { "***" })
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientOptions {
    /// Create a new builder for ClientOptions
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }
}

/// Builder for ClientOptions
#[derive(Default)]
pub struct ClientOptionsBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    session_token: Option<String>,
    timeout: Option<u64>,
}

impl ClientOptionsBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ClientOptions> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::config("base_url is required"))?;

        Ok(ClientOptions {
            server: ServerConfig::new(base_url, self.api_key.unwrap_or_default()),
            session_token: self.session_token.unwrap_or_default(),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_scheme_defaults_to_http() {
        for input in ["localhost:3000", "10.0.0.5:3001", "chat.example.com", "  host/webui  "] {
            let url = ServerConfig::new(input, "").normalized_base_url().unwrap();
            assert_eq!(url.scheme(), "http", "input: {input:?}");
        }
    }

    #[test]
    fn test_explicit_scheme_preserved() {
        let url = ServerConfig::new("https://chat.example.com", "")
            .normalized_base_url()
            .unwrap();
        assert_eq!(url.scheme(), "https");

        let url = ServerConfig::new("http://localhost:8080", "")
            .normalized_base_url()
            .unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn test_invalid_base_urls() {
        for input in ["", "   ", "http://", "http://exa mple.com"] {
            let err = ServerConfig::new(input, "").endpoint("/api/models").unwrap_err();
            assert!(
                matches!(err, Error::InvalidConfiguration(_)),
                "input {input:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_endpoint_joins_path() {
        let config = ServerConfig::new("http://localhost:3000", "");
        assert_eq!(
            config.endpoint("/api/models").unwrap().as_str(),
            "http://localhost:3000/api/models"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_trailing_slash() {
        let config = ServerConfig::new("https://example.com/webui/", "");
        assert_eq!(
            config.endpoint("/api/v1/files/").unwrap().as_str(),
            "https://example.com/webui/api/v1/files/"
        );
        assert_eq!(
            config.endpoint("/api/v1/files").unwrap().as_str(),
            "https://example.com/webui/api/v1/files"
        );
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("http://x"));
        assert!(has_scheme("https://x"));
        assert!(!has_scheme("localhost:3000"));
        assert!(!has_scheme("x/y?next=http://z"));
    }

    #[test]
    fn test_resolve_base_url_priority() {
        assert_eq!(
            resolve_base_url(Some("http://env:1".into()), Some("http://fallback:2")),
            "http://env:1"
        );
        assert_eq!(
            resolve_base_url(Some("  ".into()), Some("http://fallback:2")),
            "http://fallback:2"
        );
        assert_eq!(resolve_base_url(None, None), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = ServerConfig::new("http://localhost:3000", "sk-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_client_options_builder_defaults() {
        let options = ClientOptions::builder()
            .base_url("http://localhost:3000")
            .build()
            .unwrap();

        assert_eq!(options.server.api_key, "");
        assert_eq!(options.session_token, "");
        assert_eq!(options.timeout, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_client_options_builder_missing_base_url() {
        let result = ClientOptions::builder().api_key("k").build();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }
}
