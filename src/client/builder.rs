//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```no_run
//! use gotify_relay::{GotifyClient, TracingDispatcher};
//!
//! # fn example() -> gotify_relay::Result<()> {
//! let client = GotifyClient::builder()
//!     .token("CxYzUAbc")
//!     .endpoint("ws://gotify.local/stream?token=CxYzUAbc")
//!     .headers(r#"[{"Key":"X-Proxy-Auth","Value":"secret"}]"#)
//!     .dispatcher(TracingDispatcher)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::config::{ClientOptions, ConnectionIdentity};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};

use super::core::GotifyClient;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`GotifyClient`].
///
/// Use [`GotifyClient::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Client token.
    token: Option<String>,
    /// Stream endpoint.
    endpoint: Option<String>,
    /// Serialized custom headers.
    headers: Option<String>,
    /// Timing and diagnostics.
    options: ClientOptions,
    /// Downstream collaborator.
    dispatcher: Option<Arc<dyn Dispatcher>>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the client token.
    #[inline]
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the stream endpoint.
    ///
    /// The endpoint is validated by `start`, not here.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the serialized custom header list.
    #[inline]
    #[must_use]
    pub fn headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    /// Copies token, endpoint and headers from an existing identity.
    #[must_use]
    pub fn identity(mut self, identity: &ConnectionIdentity) -> Self {
        self.token = Some(identity.token().to_owned());
        self.endpoint = Some(identity.endpoint().to_owned());
        self.headers = identity.raw_headers().map(str::to_owned);
        self
    }

    /// Sets timing and diagnostics options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the dispatcher.
    #[inline]
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: impl Dispatcher) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    /// Sets a shared dispatcher.
    #[inline]
    #[must_use]
    pub fn shared_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the token is missing or empty
    /// - [`Error::Config`] if no dispatcher is set
    pub fn build(self) -> Result<GotifyClient> {
        let token = self.validate_token()?;
        let dispatcher = self.dispatcher.ok_or_else(|| {
            Error::config(
                "Dispatcher is required. Use .dispatcher() to set it.\n\
                 Example: GotifyClient::builder().dispatcher(TracingDispatcher)",
            )
        })?;

        let mut identity = ConnectionIdentity::new(token, self.endpoint.unwrap_or_default());
        if let Some(headers) = self.headers {
            identity = identity.with_headers(headers);
        }

        Ok(GotifyClient::new(identity, self.options, dispatcher))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the token configuration.
    fn validate_token(&self) -> Result<String> {
        let token = self.token.clone().ok_or_else(|| {
            Error::config(
                "Client token is required. Use .token() to set it.\n\
                 Example: GotifyClient::builder().token(\"CxYzUAbc\")",
            )
        })?;

        if token.trim().is_empty() {
            return Err(Error::config("Client token must not be empty"));
        }

        Ok(token)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::client::ConnectionState;
    use crate::dispatch::TracingDispatcher;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ClientBuilder::new();
        assert!(builder.token.is_none());
        assert!(builder.endpoint.is_none());
        assert!(builder.headers.is_none());
        assert!(builder.dispatcher.is_none());
        assert_eq!(builder.options, ClientOptions::default());
    }

    #[test]
    fn test_build_fails_without_token() {
        let err = ClientBuilder::new()
            .endpoint("ws://localhost")
            .dispatcher(TracingDispatcher)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_build_fails_with_blank_token() {
        let result = ClientBuilder::new()
            .token("  ")
            .dispatcher(TracingDispatcher)
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_build_fails_without_dispatcher() {
        let err = ClientBuilder::new().token("abc").build().unwrap_err();
        assert!(err.to_string().contains("Dispatcher"));
    }

    #[test]
    fn test_build_allows_empty_endpoint() {
        let client = ClientBuilder::new()
            .token("abc")
            .dispatcher(TracingDispatcher)
            .build()
            .expect("endpoint is checked at start");
        assert_eq!(client.identity().endpoint(), "");
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_identity_copies_fields() {
        let identity = ConnectionIdentity::new("abc", "ws://localhost/stream")
            .with_headers(r#"[{"Key":"A","Value":"b"}]"#);
        let client = ClientBuilder::new()
            .identity(&identity)
            .dispatcher(TracingDispatcher)
            .build()
            .unwrap();
        assert_eq!(client.identity(), &identity);
    }

    #[test]
    fn test_options_applied() {
        let options = ClientOptions::new().with_retry_delay(Duration::from_secs(1));
        let client = ClientBuilder::new()
            .token("abc")
            .options(options)
            .dispatcher(TracingDispatcher)
            .build()
            .unwrap();
        assert_eq!(client.options().retry_delay, Duration::from_secs(1));
    }
}
