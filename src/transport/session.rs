//! One WebSocket session to a Gotify stream.
//!
//! A [`Session`] is opened for every (re)connection and never reused. It
//! spawns a tokio task that:
//!
//! - Connects and upgrades, applying custom headers to the handshake
//! - Forwards every inbound text frame to the pipeline channel, in order
//! - Pings after an idle interval and gives up after a second one
//! - Reports [`SessionSignal::Connected`] once and
//!   [`SessionSignal::Disconnected`] exactly once
//!
//! The session never reconnects by itself; the classification in the
//! disconnection signal is what the controller acts on.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout, timeout_at};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, trace, warn};

use crate::client::DisconnectionKind;
use crate::config::{ClientOptions, ConnectionIdentity, CustomHeader};
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::pipeline::Frame;

// ============================================================================
// Constants
// ============================================================================

/// Reason sent with the close frame on `stop`.
const CLOSE_REASON: &str = "Connection closing.";

// ============================================================================
// Types
// ============================================================================

/// Lifecycle callback type.
///
/// Called from the session task; must not block for long.
pub type SignalHandler = Arc<dyn Fn(SessionSignal) + Send + Sync>;

/// Lifecycle signal emitted by a session task.
#[derive(Debug)]
pub enum SessionSignal {
    /// Handshake completed.
    Connected {
        /// Session that connected.
        session_id: SessionId,
    },
    /// Session ended. Emitted exactly once per session.
    Disconnected {
        /// Session that ended.
        session_id: SessionId,
        /// Classification driving reconnection.
        kind: DisconnectionKind,
        /// Underlying failure, if any.
        error: Option<Error>,
    },
}

impl SessionSignal {
    /// Returns the session this signal belongs to.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Connected { session_id } | Self::Disconnected { session_id, .. } => *session_id,
        }
    }
}

/// Commands for the session task.
enum SessionCommand {
    /// Send a close frame and end the session.
    Close,
}

// ============================================================================
// SessionHandle
// ============================================================================

/// Handle to a live session, passed to the dispatcher with every message.
#[derive(Clone)]
pub struct SessionHandle {
    /// Client token the session belongs to.
    token: Arc<str>,
    /// Session id.
    id: SessionId,
    /// Channel to the session task.
    command_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Returns the client token. Doubles as the session name in logs.
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the session id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns `true` while the session task is running.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.command_tx.is_closed()
    }
}

#[cfg(test)]
impl SessionHandle {
    /// Creates a handle with no session task behind it.
    pub(crate) fn detached(token: &str) -> Self {
        let (command_tx, _command_rx) = mpsc::unbounded_channel();
        Self {
            token: Arc::from(token),
            id: SessionId::next(),
            command_tx,
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("token", &self.token)
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Owner of one session task.
///
/// Dropping a session asks its task to close.
pub struct Session {
    /// Shared handle.
    handle: SessionHandle,
    /// Session task.
    task: JoinHandle<()>,
}

impl Session {
    /// Spawns a session task for a prepared handshake request.
    ///
    /// Must be called within a tokio runtime.
    pub(crate) fn open(
        token: &str,
        request: Request,
        options: &ClientOptions,
        frames: mpsc::UnboundedSender<Frame>,
        on_signal: SignalHandler,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            token: Arc::from(token),
            id: SessionId::next(),
            command_tx,
        };

        debug!(token, session_id = %handle.id, "Opening session");

        let task = tokio::spawn(Self::run(
            handle.clone(),
            request,
            *options,
            command_rx,
            frames,
            on_signal,
        ));

        Self { handle, task }
    }

    /// Returns the session id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.handle.id
    }

    /// Asks the session task to close without waiting.
    pub fn shutdown(&self) {
        let _ = self.handle.command_tx.send(SessionCommand::Close);
    }

    /// Closes the session and waits for its task until `deadline`.
    ///
    /// A task still running at the deadline is aborted.
    pub async fn close(mut self, deadline: Instant) {
        self.shutdown();

        if timeout_at(deadline, &mut self.task).await.is_err() {
            debug!(
                token = %self.handle.token,
                session_id = %self.handle.id,
                "Session did not close in time, aborting"
            );
            self.task.abort();
        }
    }

    /// Session task: connect, then pump frames until the session ends.
    async fn run(
        handle: SessionHandle,
        request: Request,
        options: ClientOptions,
        mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
        frames: mpsc::UnboundedSender<Frame>,
        on_signal: SignalHandler,
    ) {
        let token = handle.token();
        let session_id = handle.id;

        // Connect phase
        let connect = timeout(
            options.connect_timeout,
            tokio_tungstenite::connect_async(request),
        );

        let ws_stream = tokio::select! {
            biased;

            command = command_rx.recv() => {
                let kind = match command {
                    Some(SessionCommand::Close) => DisconnectionKind::ByUser,
                    None => DisconnectionKind::Exit,
                };
                debug!(token, %session_id, %kind, "Session closed before connecting");
                on_signal(SessionSignal::Disconnected { session_id, kind, error: None });
                return;
            }

            result = connect => match result {
                Ok(Ok((ws_stream, _response))) => ws_stream,
                Ok(Err(e)) => {
                    let error = Error::transport(format!("Handshake failed: {e}"));
                    warn!(token, %session_id, error = %error, "WebSocket connection failed");
                    on_signal(SessionSignal::Disconnected {
                        session_id,
                        kind: DisconnectionKind::Error,
                        error: Some(error),
                    });
                    return;
                }
                Err(_) => {
                    let error = Error::connection_timeout(options.connect_timeout.as_millis() as u64);
                    warn!(token, %session_id, error = %error, "WebSocket connection timed out");
                    on_signal(SessionSignal::Disconnected {
                        session_id,
                        kind: DisconnectionKind::Error,
                        error: Some(error),
                    });
                    return;
                }
            }
        };

        info!(token, %session_id, "WebSocket connection established");
        on_signal(SessionSignal::Connected { session_id });

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut awaiting_pong = false;

        let (kind, error) = loop {
            tokio::select! {
                biased;

                command = command_rx.recv() => {
                    match command {
                        Some(SessionCommand::Close) => {
                            let frame = CloseFrame {
                                code: CloseCode::Normal,
                                reason: Utf8Bytes::from_static(CLOSE_REASON),
                            };
                            if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
                                debug!(token, %session_id, error = %e, "Failed to send close frame");
                            }
                            break (DisconnectionKind::ByUser, None);
                        }
                        None => {
                            let _ = ws_write.close().await;
                            break (DisconnectionKind::Exit, None);
                        }
                    }
                }

                message = timeout(options.idle_timeout, ws_read.next()) => {
                    match message {
                        Err(_) if awaiting_pong => {
                            warn!(token, %session_id, "No message received within two idle intervals");
                            break (DisconnectionKind::NoMessageReceived, None);
                        }

                        Err(_) => {
                            trace!(token, %session_id, "Stream idle, sending ping");
                            if let Err(e) = ws_write.send(Message::Ping(Default::default())).await {
                                let error = Error::from_stream_error(e);
                                let kind = error.disconnection_kind().unwrap_or(DisconnectionKind::Error);
                                break (kind, Some(error));
                            }
                            awaiting_pong = true;
                        }

                        Ok(Some(Ok(message))) => {
                            awaiting_pong = false;

                            let text = match message {
                                Message::Text(text) => Some(text.as_str().to_owned()),
                                Message::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok(),
                                Message::Close(frame) => {
                                    debug!(token, %session_id, ?frame, "WebSocket closed by server");
                                    break (DisconnectionKind::ByServer, None);
                                }
                                // Ping, Pong, raw frames only prove liveness
                                _ => continue,
                            };

                            let frame = Frame { text, session: handle.clone() };
                            if frames.send(frame).is_err() {
                                debug!(token, %session_id, "Frame consumer gone");
                                break (DisconnectionKind::Exit, None);
                            }
                        }

                        Ok(Some(Err(e))) => {
                            let error = Error::from_stream_error(e);
                            let kind = error.disconnection_kind().unwrap_or(DisconnectionKind::Error);
                            break (kind, Some(error));
                        }

                        Ok(None) => {
                            let error = Error::transport_lost("Stream ended without close handshake");
                            break (DisconnectionKind::Lost, Some(error));
                        }
                    }
                }
            }
        };

        // Release the socket before the controller can open a successor.
        drop(ws_write);
        drop(ws_read);

        match &error {
            Some(error) => {
                info!(token, %session_id, %kind, error = %error, "Disconnection happened");
            }
            None => info!(token, %session_id, %kind, "Disconnection happened"),
        }

        on_signal(SessionSignal::Disconnected {
            session_id,
            kind,
            error,
        });
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Session is not Clone, so dropping the owner ends the task.
        self.shutdown();
    }
}

// ============================================================================
// Handshake Request
// ============================================================================

/// Builds the handshake request for an identity.
///
/// Never performs I/O.
///
/// # Errors
///
/// Returns [`Error::Config`] if the endpoint is empty or invalid. Header
/// problems only degrade the request and are logged.
pub(crate) fn build_request(identity: &ConnectionIdentity) -> Result<Request> {
    let url = identity.endpoint_url()?;

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| Error::config(format!("Endpoint \"{url}\" is not usable: {e}")))?;

    match identity.custom_headers() {
        Ok(headers) => apply_headers(&mut request, &headers, identity.token()),
        Err(e) => {
            warn!(
                token = identity.token(),
                error = %e,
                "Custom headers could not be parsed, connecting without them"
            );
        }
    }

    Ok(request)
}

/// Appends custom headers in order, skipping the ones HTTP rejects.
fn apply_headers(request: &mut Request, headers: &[CustomHeader], token: &str) {
    for header in headers {
        let Some((key, value)) = header.pair() else {
            continue;
        };

        let name = match HeaderName::from_bytes(key.as_bytes()) {
            Ok(name) => name,
            Err(e) => {
                warn!(token, header = key, error = %e, "Skipping invalid header name");
                continue;
            }
        };

        let value = match HeaderValue::from_str(value) {
            Ok(value) => value,
            Err(e) => {
                warn!(token, header = key, error = %e, "Skipping invalid header value");
                continue;
            }
        };

        request.headers_mut().append(name, value);
    }
}

// ============================================================================
// Tests
// ============================================================================
