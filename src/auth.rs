//! Credential selection for outgoing requests
//!
//! Two credentials can be configured at once: a session token obtained from
//! [`Client::sign_in`](crate::Client::sign_in) and a static API key from the
//! server settings. The session token wins when present. Whatever is chosen is
//! sent twice, as `Authorization: Bearer <value>` and as `X-API-Key: <value>`,
//! since deployments differ in which of the two they read.

use reqwest::RequestBuilder;

/// Header carrying the raw credential for servers that ignore `Authorization`
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Session token returned by sign-in. Empty means signed out.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionCredential {
    pub token: String,
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl SessionCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn sign_out(&mut self) {
        self.token.clear();
    }
}

/// Pick the credential to present: session token, then API key, then nothing.
pub fn select_credential<'a>(session_token: &'a str, api_key: &'a str) -> Option<&'a str> {
    if !session_token.is_empty() {
        Some(session_token)
    } else if !api_key.is_empty() {
        Some(api_key)
    } else {
        None
    }
}

/// Attach both auth headers when a credential is available.
pub(crate) fn apply_credential(builder: RequestBuilder, credential: Option<&str>) -> RequestBuilder {
    match credential {
        Some(value) => builder
            .bearer_auth(value)
            .header(API_KEY_HEADER, value),
        None => builder,
    }
}
