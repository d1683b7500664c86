//! Error types for the Gotify relay.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Propagation
//!
//! Only [`Error::Config`] is ever returned to the caller of
//! [`GotifyClient::start`](crate::GotifyClient::start). Every other kind is
//! absorbed by the session, pipeline or controller and surfaces as a log entry.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::HeaderParse`] |
//! | Frames | [`Error::FrameDecode`] |
//! | Dispatch | [`Error::Dispatch`] |
//! | Transport | [`Error::Transport`], [`Error::TransportLost`], [`Error::ConnectionTimeout`] |
//! | External | [`Error::Io`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::error::ProtocolError;

use crate::client::DisconnectionKind;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned synchronously from `start` when the identity cannot be used,
    /// e.g. an empty or unparseable endpoint.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Custom header list could not be parsed.
    ///
    /// Non-fatal: the session starts without custom headers.
    #[error("Header parse error: {message}")]
    HeaderParse {
        /// Description of the parse failure.
        message: String,
    },

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// Inbound frame is not a valid Gotify message.
    #[error("Frame decode error: {source}")]
    FrameDecode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    // ========================================================================
    // Dispatch Errors
    // ========================================================================
    /// The downstream dispatcher failed to deliver a message.
    #[error("Dispatch failed: {message}")]
    Dispatch {
        /// Description of the dispatch failure.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Handshake or semantic transport failure.
    ///
    /// Drives a delayed reconnection.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// Connection dropped without a close handshake.
    ///
    /// Drives an immediate reconnection.
    #[error("Connection lost: {message}")]
    TransportLost {
        /// Description of how the connection was lost.
        message: String,
    },

    /// Handshake did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error, e.g. from signal handling in binaries built on the crate.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a header parse error.
    #[inline]
    pub fn header_parse(message: impl Into<String>) -> Self {
        Self::HeaderParse {
            message: message.into(),
        }
    }

    /// Creates a frame decode error.
    #[inline]
    pub fn frame_decode(source: serde_json::Error) -> Self {
        Self::FrameDecode { source }
    }

    /// Creates a dispatch error.
    #[inline]
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a transport lost error.
    #[inline]
    pub fn transport_lost(message: impl Into<String>) -> Self {
        Self::TransportLost {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Classifies a WebSocket error raised while the session was open.
    ///
    /// Resets, broken pipes and streams cut without a close handshake are
    /// [`Error::TransportLost`]; everything else is [`Error::Transport`].
    pub fn from_stream_error(err: WsError) -> Self {
        let lost = match &err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => true,
            WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
            WsError::Io(io) => matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
                    | ErrorKind::NotConnected
                    | ErrorKind::TimedOut
            ),
            _ => false,
        };

        if lost {
            Self::transport_lost(err.to_string())
        } else {
            Self::transport(err.to_string())
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error must be reported to the `start` caller.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Maps a transport failure onto the disconnection it causes.
    ///
    /// Returns `None` for errors that never end a session.
    #[must_use]
    pub fn disconnection_kind(&self) -> Option<DisconnectionKind> {
        match self {
            Self::TransportLost { .. } => Some(DisconnectionKind::Lost),
            Self::Transport { .. } | Self::ConnectionTimeout { .. } => Some(DisconnectionKind::Error),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
