//! Gotify stream protocol.
//!
//! The stream is one-way: the server pushes one JSON message per text frame
//! and never expects a reply.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | [`GotifyMessage`] and its `extras` namespaces |
//! | `normalize` | Rewrites `::` vendor keys before parsing |

// ============================================================================
// Submodules
// ============================================================================

/// Gotify message types.
pub mod message;

/// Vendor key normalization.
pub mod normalize;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{
    AndroidAction, ClickAction, ClientDisplay, ClientNotification, Extras, GotifyMessage,
    IntentAction,
};
pub use normalize::{KEY_SUBSTITUTIONS, normalize};
