//! Gotify relay - Persistent Gotify stream client.
//!
//! This library keeps one WebSocket connection per registered client token
//! open against a Gotify server's `/stream` endpoint, turns every pushed
//! frame into a typed [`GotifyMessage`] and hands it to a [`Dispatcher`].
//!
//! # Architecture
//!
//! - **Client**: [`GotifyClient`] owns the lifecycle and reconnection rules
//! - **Session**: one WebSocket connection per (re)connection, never reused
//! - **Pipeline**: one ordered worker per client, shared by its sessions
//! - **Dispatcher**: downstream collaborator, called once per message
//!
//! Key design principles:
//!
//! - A lost connection is reopened immediately, a failed one once after a delay
//! - Signals from superseded sessions are ignored
//! - Frames are dispatched in arrival order, one at a time
//! - One bad frame never takes the client down
//!
//! # Quick Start
//!
//! ```no_run
//! use gotify_relay::{GotifyClient, Result, TracingDispatcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = GotifyClient::builder()
//!         .token("CxYzUAbc")
//!         .endpoint("ws://gotify.local/stream?token=CxYzUAbc")
//!         .dispatcher(TracingDispatcher)
//!         .build()?;
//!
//!     client.start(false)?;
//!     tokio::signal::ctrl_c().await?;
//!     client.stop().await;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client, builder, registry and lifecycle states |
//! | [`config`] | Connection identity and options |
//! | [`dispatch`] | [`Dispatcher`] trait |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`pipeline`] | Frame normalization, parsing and dispatch |
//! | [`protocol`] | Gotify message types |
//! | [`transport`] | WebSocket sessions |
//!
//! # Features
//!
//! - **`rustls`**: enables `wss://` endpoints with webpki roots

// ============================================================================
// Modules
// ============================================================================

/// Clients, builder, registry and lifecycle states.
///
/// Use [`GotifyClient::builder()`] to create a configured client.
pub mod client;

/// Connection identity and options.
pub mod config;

/// Downstream dispatch.
pub mod dispatch;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Per-client message pipeline.
pub mod pipeline;

/// Gotify message types and key normalization.
pub mod protocol;

/// WebSocket transport layer.
///
/// Handles one session per (re)connection.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, ClientRegistry, ConnectionState, DisconnectionKind, GotifyClient};

// Config types
pub use config::{ClientOptions, ConnectionIdentity, CustomHeader};

// Dispatch types
pub use dispatch::{Dispatcher, TracingDispatcher};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::SessionId;

// Pipeline types
pub use pipeline::{Frame, FrameOutcome, MessagePipeline};

// Protocol types
pub use protocol::{Extras, GotifyMessage, normalize};

// Transport types
pub use transport::{SessionHandle, SessionSignal};
