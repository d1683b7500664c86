//! Per-connection identity.
//!
//! A [`ConnectionIdentity`] names one logical Gotify stream: the client token
//! used for log correlation and registry keying, the endpoint to connect to,
//! and an optional serialized list of custom handshake headers.
//!
//! # Header Format
//!
//! Headers are stored as they come from persistence, a JSON array of
//! `Key`/`Value` objects:
//!
//! ```json
//! [{"Key": "Authorization", "Value": "Basic dXNlcjpwYXNz"}]
//! ```
//!
//! They are only parsed when a session starts. A list that fails to parse
//! yields [`Error::HeaderParse`] and the session falls back to no headers.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// CustomHeader
// ============================================================================

/// One custom handshake header.
///
/// Either side may be missing in stored data; such entries are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomHeader {
    /// Header name.
    #[serde(rename = "Key", default)]
    pub key: Option<String>,

    /// Header value.
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
}

impl CustomHeader {
    /// Returns the key/value pair if both are present.
    #[inline]
    #[must_use]
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (&self.key, &self.value) {
            (Some(key), Some(value)) => Some((key.as_str(), value.as_str())),
            _ => None,
        }
    }
}

// ============================================================================
// ConnectionIdentity
// ============================================================================

/// Immutable configuration of one persistent connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionIdentity {
    /// Client token. Unique per connection.
    token: String,
    /// WebSocket endpoint, e.g. `ws://gotify.local/stream?token=...`.
    endpoint: String,
    /// Serialized custom header list, if any.
    headers: Option<String>,
}

impl ConnectionIdentity {
    /// Creates an identity without custom headers.
    #[must_use]
    pub fn new(token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: endpoint.into(),
            headers: None,
        }
    }

    /// Attaches a serialized header list.
    ///
    /// An empty string is treated as no headers.
    #[must_use]
    pub fn with_headers(mut self, headers: impl Into<String>) -> Self {
        let headers = headers.into();
        self.headers = (!headers.is_empty()).then_some(headers);
        self
    }

    /// Returns the client token.
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the endpoint as configured.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the serialized header list, if any.
    #[inline]
    #[must_use]
    pub fn raw_headers(&self) -> Option<&str> {
        self.headers.as_deref()
    }

    /// Validates the endpoint without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is empty or not a URL, or if
    /// it is `wss://` and the crate was built without the `rustls` feature.
    pub fn endpoint_url(&self) -> Result<Url> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::config(format!(
                "Endpoint is empty for client token \"{}\"",
                self.token
            )));
        }

        let url = Url::parse(&self.endpoint).map_err(|e| {
            Error::config(format!(
                "Endpoint \"{}\" is not a valid URL: {e}",
                self.endpoint
            ))
        })?;

        #[cfg(not(feature = "rustls"))]
        if url.scheme() == "wss" {
            return Err(Error::config(format!(
                "Endpoint \"{}\" needs TLS. Rebuild with the `rustls` feature enabled.",
                self.endpoint
            )));
        }

        Ok(url)
    }

    /// Parses the custom header list.
    ///
    /// Returns an empty list when no headers are configured. Entries with a
    /// missing key or value are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeaderParse`] if the stored list is not a JSON array
    /// of `Key`/`Value` objects.
    pub fn custom_headers(&self) -> Result<Vec<CustomHeader>> {
        let Some(raw) = self.headers.as_deref() else {
            return Ok(Vec::new());
        };

        let parsed: Option<Vec<CustomHeader>> =
            serde_json::from_str(raw).map_err(|e| Error::header_parse(e.to_string()))?;

        Ok(parsed
            .unwrap_or_default()
            .into_iter()
            .filter(|header| header.pair().is_some())
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
