//! Downstream notification dispatch.
//!
//! The relay does not deliver notifications itself. Every parsed message is
//! handed to a [`Dispatcher`] together with the [`SessionHandle`] it arrived
//! on. Calls for one client are strictly sequential, so an implementation may
//! block or await freely without reordering that client's messages.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//! use gotify_relay::{Dispatcher, GotifyMessage, Result, SessionHandle};
//!
//! struct Apns;
//!
//! #[async_trait]
//! impl Dispatcher for Apns {
//!     async fn dispatch(&self, message: &GotifyMessage, session: &SessionHandle) -> Result<()> {
//!         // look up devices for session.token() and push message.title
//!         Ok(())
//!     }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::protocol::GotifyMessage;
use crate::transport::SessionHandle;

// ============================================================================
// Dispatcher
// ============================================================================

/// Receiver of parsed messages.
#[async_trait]
pub trait Dispatcher: Send + Sync + 'static {
    /// Delivers one message.
    ///
    /// # Errors
    ///
    /// Failures are logged with the message id and title and never stop the
    /// client. Implementations should return [`Error::Dispatch`](crate::Error::Dispatch).
    async fn dispatch(&self, message: &GotifyMessage, session: &SessionHandle) -> Result<()>;
}

// ============================================================================
// TracingDispatcher
// ============================================================================

/// Dispatcher that only logs each message.
///
/// Useful for dry runs and demos.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatcher;

#[async_trait]
impl Dispatcher for TracingDispatcher {
    async fn dispatch(&self, message: &GotifyMessage, session: &SessionHandle) -> Result<()> {
        info!(
            token = session.token(),
            session_id = %session.id(),
            id = message.id,
            appid = message.appid,
            priority = message.priority,
            title = %message.title,
            "Message received"
        );
        Ok(())
    }
}
