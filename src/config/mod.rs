//! Connection configuration.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionIdentity`] | Token, endpoint and custom headers of one connection |
//! | [`CustomHeader`] | One `Key`/`Value` handshake header |
//! | [`ClientOptions`] | Timing and diagnostics |

// ============================================================================
// Submodules
// ============================================================================

/// Per-connection identity and header parsing.
pub mod identity;

/// Timing and diagnostics options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use identity::{ConnectionIdentity, CustomHeader};
pub use options::ClientOptions;
