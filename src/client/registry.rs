//! Registry of clients keyed by token.
//!
//! The process holds one [`GotifyClient`] per registered user/device. The
//! registry owns them explicitly (no global state) and guards the map with a
//! read-write lock so it can be shared across tasks behind an `Arc`.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            ClientRegistry               │
//! │  ┌─────────────────────────────────┐    │
//! │  │ token A → GotifyClient (stream) │    │
//! │  │ token B → GotifyClient (stream) │    │
//! │  │ token C → GotifyClient (stream) │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use futures_util::future::join_all;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::error::Error;

use super::core::GotifyClient;

// ============================================================================
// ClientRegistry
// ============================================================================

/// Lock-guarded map from client token to client.
#[derive(Default)]
pub struct ClientRegistry {
    /// Registered clients by token.
    clients: RwLock<FxHashMap<String, GotifyClient>>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered clients.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// Returns `true` if no client is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Returns the registered tokens, sorted.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<_> = self.clients.read().keys().cloned().collect();
        tokens.sort_unstable();
        tokens
    }

    /// Returns the client for a token.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<GotifyClient> {
        self.clients.read().get(token).cloned()
    }

    /// Registers a client under its token.
    ///
    /// A client previously registered under the same token is stopped.
    pub async fn insert(&self, client: GotifyClient) {
        let token = client.token().to_owned();
        let replaced = self.clients.write().insert(token.clone(), client);

        if let Some(previous) = replaced {
            debug!(token, "Replacing registered client");
            previous.stop().await;
        }
    }

    /// Starts every registered client.
    ///
    /// Returns the clients that failed with a configuration error.
    pub fn start_all(&self) -> Vec<(String, Error)> {
        let clients: Vec<_> = self.clients.read().values().cloned().collect();
        let mut failures = Vec::new();

        for client in clients {
            if let Err(e) = client.start(false) {
                warn!(token = client.token(), error = %e, "Client failed to start");
                failures.push((client.token().to_owned(), e));
            }
        }

        info!(
            started = self.len().saturating_sub(failures.len()),
            failed = failures.len(),
            "Registry started"
        );

        failures
    }

    /// Removes and stops the client for a token.
    ///
    /// Returns `false` if no client was registered under it.
    pub async fn remove(&self, token: &str) -> bool {
        let removed = self.clients.write().remove(token);

        match removed {
            Some(client) => {
                client.stop().await;
                debug!(token, "Client removed from registry");
                true
            }
            None => false,
        }
    }

    /// Removes and stops every client concurrently.
    pub async fn stop_all(&self) {
        info!("Registry shutting down");

        let clients: Vec<_> = {
            let mut map = self.clients.write();
            map.drain().map(|(_, client)| client).collect()
        };

        join_all(clients.iter().map(|client| client.stop())).await;

        info!(count = clients.len(), "Registry shutdown complete");
    }
}

// ============================================================================
// Tests
// ============================================================================
