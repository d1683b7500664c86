//! Client timing and diagnostics options.
//!
//! The defaults are the fixed values the relay runs with in production.
//! Tests shorten them to keep reconnection scenarios fast.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use gotify_relay::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_retry_delay(Duration::from_secs(5))
//!     .with_verbose();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Silence on the stream before a ping is sent, and again before giving up.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay before retrying after an error-class disconnection.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Time `stop` waits for the close to propagate.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Upper bound on connect + WebSocket upgrade.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// ClientOptions
// ============================================================================

/// Timing and logging configuration for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Idle interval used for liveness detection.
    pub idle_timeout: Duration,

    /// Fixed backoff after an `Error` disconnection.
    pub retry_delay: Duration,

    /// Grace period `stop` blocks for.
    pub close_grace: Duration,

    /// Handshake timeout.
    pub connect_timeout: Duration,

    /// Log converted frames and error source chains.
    pub verbose: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with the production defaults.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            close_grace: DEFAULT_CLOSE_GRACE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            verbose: false,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the idle interval.
    #[inline]
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Sets the delay before an error retry.
    #[inline]
    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sets the stop grace period.
    #[inline]
    #[must_use]
    pub fn with_close_grace(mut self, close_grace: Duration) -> Self {
        self.close_grace = close_grace;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Enables verbose diagnostics.
    #[inline]
    #[must_use]
    pub fn with_verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
