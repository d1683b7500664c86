//! Gotify stream clients.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`GotifyClient`] | One persistent stream connection with reconnection |
//! | [`ClientBuilder`] | Fluent client configuration |
//! | [`ClientRegistry`] | Clients keyed by token |
//! | [`ConnectionState`] | Observable lifecycle state |
//! | [`DisconnectionKind`] | Why a session ended |

// ============================================================================
// Submodules
// ============================================================================

/// Client builder.
pub mod builder;

/// Client lifecycle and reconnection control.
pub mod core;

/// Clients keyed by token.
pub mod registry;

/// Connection states and disconnection kinds.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::GotifyClient;
pub use registry::ClientRegistry;
pub use state::{ConnectionState, DisconnectionKind};
