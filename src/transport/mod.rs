//! WebSocket transport layer.
//!
//! The relay is the client side of the Gotify stream:
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  GotifyClient   │                              │  Gotify server  │
//! │                 │         WebSocket            │                 │
//! │  Session        │◄────────────────────────────►│  /stream        │
//! │  → Pipeline     │      text frames (JSON)      │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Session Lifecycle
//!
//! 1. `build_request` - Endpoint URL plus custom headers, no I/O
//! 2. `Session::open` - Spawn the session task
//! 3. `SessionSignal::Connected` - Handshake done, frames start flowing
//! 4. `SessionSignal::Disconnected` - Classified end, emitted once
//! 5. `Session::close` - Close frame on stop, bounded by a deadline

// ============================================================================
// Submodules
// ============================================================================

/// One WebSocket session and its event loop.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use session::{Session, SessionHandle, SessionSignal, SignalHandler};
