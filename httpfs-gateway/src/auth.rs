//! `Authorization: Basic` header parsing.
//!
//! The "password" half of the credential is the API key; the username is
//! carried along for logging only.

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};

const BASIC_PREFIX: &str = "Basic ";

/// Username and API key from a basic-auth header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub api_key: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("api_key", &httpfs_core::credentials::redact(&self.api_key))
            .finish()
    }
}

/// Extract basic-auth credentials from request headers.
#[must_use]
pub fn basic_credentials(headers: &HeaderMap) -> Option<BasicCredentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    decode_basic(value)
}

/// Decode an `Authorization` header value of the `Basic` scheme.
///
/// The scheme name is matched case-insensitively. The decoded text is split
/// at the first `:`, so API keys may themselves contain colons.
#[must_use]
pub fn decode_basic(value: &str) -> Option<BasicCredentials> {
    let prefix = value.get(..BASIC_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BASIC_PREFIX) {
        return None;
    }
    let decoded = STANDARD.decode(value[BASIC_PREFIX.len()..].trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, api_key) = decoded.split_once(':')?;
    Some(BasicCredentials {
        username: username.to_owned(),
        api_key: api_key.to_owned(),
    })
}
