//! Connection states and disconnection kinds.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected and no retry pending. Initial state.
    #[default]
    Disconnected,
    /// First session is being established.
    Connecting,
    /// A session is open.
    Connected,
    /// A replacement session is being established or scheduled.
    Reconnecting,
    /// `stop` was called. Terminal until the next `start`.
    Stopped,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

// ============================================================================
// DisconnectionKind
// ============================================================================

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectionKind {
    /// Stream dropped without a close handshake. Reconnect immediately.
    Lost,
    /// Handshake or protocol failure. Reconnect once after the retry delay.
    Error,
    /// The session's owner or frame consumer went away.
    Exit,
    /// Server sent a close frame.
    ByServer,
    /// Nothing arrived for two idle intervals.
    NoMessageReceived,
    /// Closed locally.
    ByUser,
}

impl DisconnectionKind {
    /// Returns `true` if this kind triggers an automatic reconnection.
    #[inline]
    #[must_use]
    pub const fn reconnects(self) -> bool {
        matches!(self, Self::Lost | Self::Error)
    }
}

impl fmt::Display for DisconnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lost => "Lost",
            Self::Error => "Error",
            Self::Exit => "Exit",
            Self::ByServer => "ByServer",
            Self::NoMessageReceived => "NoMessageReceived",
            Self::ByUser => "ByUser",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_only_lost_and_error_reconnect() {
        assert!(DisconnectionKind::Lost.reconnects());
        assert!(DisconnectionKind::Error.reconnects());
        for kind in [
            DisconnectionKind::Exit,
            DisconnectionKind::ByServer,
            DisconnectionKind::NoMessageReceived,
            DisconnectionKind::ByUser,
        ] {
            assert!(!kind.reconnects(), "{kind} must not reconnect");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
        assert_eq!(DisconnectionKind::NoMessageReceived.to_string(), "NoMessageReceived");
    }
}
