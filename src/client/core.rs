//! Client lifecycle and reconnection control.
//!
//! A [`GotifyClient`] owns one logical connection. It opens a fresh
//! [`Session`] on every (re)connection, feeds all of them into one pipeline
//! worker, and reacts to each session's disconnection signal:
//!
//! | Disconnection | Reaction |
//! |---------------|----------|
//! | `Lost` | restart immediately |
//! | `Error` | restart once after the retry delay, unless stopped meanwhile |
//! | anything else | stay disconnected |
//!
//! # Shutdown
//!
//! [`GotifyClient::stop`] marks the client stopped under the same lock that
//! installs sessions, cancels the client's [`CancellationToken`], closes the
//! live session and blocks for the close grace period. A delayed retry that
//! fires afterwards sees the stopped flag and does nothing.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ClientOptions, ConnectionIdentity};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::identifiers::SessionId;
use crate::pipeline::{Frame, MessagePipeline};
use crate::transport::session::build_request;
use crate::transport::{Session, SessionSignal, SignalHandler};

use super::builder::ClientBuilder;
use super::state::{ConnectionState, DisconnectionKind};

// ============================================================================
// Types
// ============================================================================

/// Pipeline worker shared by the sessions of one run.
struct PipelineWorker {
    /// Frame channel into the worker.
    frames: mpsc::UnboundedSender<Frame>,
    /// Worker task.
    task: JoinHandle<()>,
}

/// Mutable lifecycle state, guarded by one lock.
struct Slot {
    /// Current state.
    state: ConnectionState,
    /// Set by `stop`, cleared by `start`.
    stopped: bool,
    /// Cancelled by `stop`; replaced by the next `start`.
    cancel: CancellationToken,
    /// Live session, if any.
    session: Option<Session>,
    /// Pipeline worker of the current run.
    pipeline: Option<PipelineWorker>,
    /// Pending delayed retry.
    retry: Option<JoinHandle<()>>,
    /// Bumped per scheduled retry; a firing timer must match it.
    retry_epoch: u64,
}

/// Shared client state.
struct ClientInner {
    /// Connection identity.
    identity: ConnectionIdentity,
    /// Timing and diagnostics.
    options: ClientOptions,
    /// Downstream collaborator.
    dispatcher: Arc<dyn Dispatcher>,
    /// Lifecycle state.
    slot: Mutex<Slot>,
    /// Restarts since the last successful connection.
    attempts: AtomicU32,
}

// ============================================================================
// GotifyClient
// ============================================================================

/// Handle to one persistent Gotify stream connection.
///
/// Cheap to clone; all clones control the same connection.
///
/// # Example
///
/// ```no_run
/// use gotify_relay::{GotifyClient, TracingDispatcher};
///
/// # async fn example() -> gotify_relay::Result<()> {
/// let client = GotifyClient::builder()
///     .token("CxYzUAbc")
///     .endpoint("wss://push.example.com/stream?token=CxYzUAbc")
///     .dispatcher(TracingDispatcher)
///     .build()?;
///
/// client.start(false)?;
/// // ...
/// client.stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GotifyClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for GotifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GotifyClient")
            .field("token", &self.token())
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// GotifyClient - Constructor
// ============================================================================

impl GotifyClient {
    /// Creates a client in the `Disconnected` state.
    #[must_use]
    pub fn new(
        identity: ConnectionIdentity,
        options: ClientOptions,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                identity,
                options,
                dispatcher,
                slot: Mutex::new(Slot {
                    state: ConnectionState::Disconnected,
                    stopped: false,
                    cancel: CancellationToken::new(),
                    session: None,
                    pipeline: None,
                    retry: None,
                    retry_epoch: 0,
                }),
                attempts: AtomicU32::new(0),
            }),
        }
    }

    /// Creates a client builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

// ============================================================================
// GotifyClient - Public API
// ============================================================================

impl GotifyClient {
    /// Opens a session to the identity's endpoint.
    ///
    /// Returns as soon as the session task is spawned; connection failures are
    /// handled by the reconnection rules, not reported here. Calling `start`
    /// on a running client replaces its session. Calling it after
    /// [`stop`](Self::stop) revives the client.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the endpoint is empty
    /// or invalid. No I/O is performed in that case.
    pub fn start(&self, is_restart: bool) -> Result<()> {
        let inner = &self.inner;
        let mut slot = inner.slot.lock();
        let revived = slot.stopped;

        inner.open_session(&mut slot, is_restart)?;
        slot.stopped = false;

        if revived {
            debug!(token = inner.identity.token(), "Reviving stopped client");
        }

        if !is_restart {
            info!(token = inner.identity.token(), "Client started");
        }

        Ok(())
    }

    /// Stops the client for good.
    ///
    /// Cancels any pending delayed retry, closes the live session with a close
    /// frame, then blocks for the close grace period. Afterwards no frame is
    /// handled and no reconnection happens until the next `start`.
    ///
    /// Idempotent: stopping a stopped client returns immediately.
    pub async fn stop(&self) {
        let inner = &self.inner;
        let token = inner.identity.token();

        let (session, pipeline, retry) = {
            let mut slot = inner.slot.lock();
            if slot.stopped {
                debug!(token, "Client already stopped");
                return;
            }

            slot.stopped = true;
            slot.state = ConnectionState::Stopped;
            slot.cancel.cancel();

            (slot.session.take(), slot.pipeline.take(), slot.retry.take())
        };

        if let Some(retry) = retry {
            retry.abort();
            debug!(token, "Pending retry cancelled");
        }

        let deadline = Instant::now() + inner.options.close_grace;

        if let Some(session) = session {
            session.close(deadline).await;
        }

        sleep_until(deadline).await;

        if let Some(worker) = pipeline {
            worker.task.abort();
        }

        info!(token, "Client stopped");
    }

    /// Returns the client token.
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str {
        self.inner.identity.token()
    }

    /// Returns the connection identity.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &ConnectionIdentity {
        &self.inner.identity
    }

    /// Returns the client options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.slot.lock().state
    }

    /// Returns `true` if `stop` was called since the last `start`.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.slot.lock().stopped
    }

    /// Returns the live session id, if any.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.slot.lock().session.as_ref().map(Session::id)
    }

    /// Returns the number of restarts since the last successful connection.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::Relaxed)
    }
}

// ============================================================================
// ClientInner - Sessions
// ============================================================================

impl ClientInner {
    /// Replaces the live session with a new one.
    ///
    /// The previous session is told to close before the new one is spawned.
    fn open_session(self: &Arc<Self>, slot: &mut Slot, is_restart: bool) -> Result<()> {
        let token = self.identity.token();
        let request = build_request(&self.identity)?;

        if let Some(previous) = slot.session.take() {
            debug!(token, session_id = %previous.id(), "Superseding session");
            previous.shutdown();
        }

        if slot.cancel.is_cancelled() {
            slot.cancel = CancellationToken::new();
        }

        let frames = self.ensure_pipeline(slot);
        let session = Session::open(
            token,
            request,
            &self.options,
            frames,
            self.signal_handler(is_restart),
        );

        slot.state = if is_restart {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Connecting
        };
        slot.session = Some(session);

        Ok(())
    }

    /// Returns the frame channel of the current run, spawning its worker.
    fn ensure_pipeline(&self, slot: &mut Slot) -> mpsc::UnboundedSender<Frame> {
        if let Some(worker) = &slot.pipeline
            && !worker.frames.is_closed()
        {
            return worker.frames.clone();
        }

        let (frames, rx) = mpsc::unbounded_channel();
        let task = MessagePipeline::new(Arc::clone(&self.dispatcher), self.options.verbose)
            .spawn(rx, slot.cancel.clone());

        debug!(token = self.identity.token(), "Pipeline worker started");

        slot.pipeline = Some(PipelineWorker {
            frames: frames.clone(),
            task,
        });

        frames
    }

    /// Builds the lifecycle callback for a session.
    fn signal_handler(self: &Arc<Self>, is_restart: bool) -> SignalHandler {
        let weak = Arc::downgrade(self);
        Arc::new(move |signal| {
            if let Some(inner) = weak.upgrade() {
                inner.on_signal(signal, is_restart);
            }
        })
    }
}

// ============================================================================
// ClientInner - Reconnection
// ============================================================================

impl ClientInner {
    /// Applies one session lifecycle signal.
    fn on_signal(self: &Arc<Self>, signal: SessionSignal, is_restart: bool) {
        let token = self.identity.token();
        let mut slot = self.slot.lock();

        let live = slot.session.as_ref().map(Session::id);
        if slot.stopped || live != Some(signal.session_id()) {
            trace!(token, session_id = %signal.session_id(), "Ignoring signal from inactive session");
            return;
        }

        match signal {
            SessionSignal::Connected { session_id } => {
                slot.state = ConnectionState::Connected;
                self.attempts.store(0, Ordering::Relaxed);

                if is_restart {
                    info!(token, %session_id, "Gotify client successfully reconnected");
                } else {
                    info!(token, %session_id, "Gotify client connected");
                }
            }

            SessionSignal::Disconnected { session_id, kind, .. } => {
                // The session task is ending; release it.
                slot.session = None;

                if !kind.reconnects() {
                    info!(token, %session_id, %kind, "Connection ended, not reconnecting");
                    slot.state = ConnectionState::Disconnected;
                    return;
                }

                if kind == DisconnectionKind::Lost {
                    info!(token, %session_id, "Connection lost, reconnecting");
                    self.restart(&mut slot);
                } else {
                    warn!(
                        token,
                        %session_id,
                        delay_ms = self.options.retry_delay.as_millis() as u64,
                        "Connection failed, retrying after delay"
                    );
                    slot.state = ConnectionState::Reconnecting;
                    self.schedule_retry(&mut slot);
                }
            }
        }
    }

    /// Opens a replacement session right away.
    fn restart(self: &Arc<Self>, slot: &mut Slot) {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = self.open_session(slot, true) {
            error!(token = self.identity.token(), error = %e, "Restart failed");
            slot.state = ConnectionState::Disconnected;
        }
    }

    /// Schedules one restart after the retry delay.
    ///
    /// The stopped flag is checked when the timer fires, not now.
    fn schedule_retry(self: &Arc<Self>, slot: &mut Slot) {
        if let Some(previous) = slot.retry.take() {
            previous.abort();
        }

        slot.retry_epoch += 1;
        let epoch = slot.retry_epoch;
        let weak = Arc::downgrade(self);
        let cancel = slot.cancel.clone();
        let delay = self.options.retry_delay;

        slot.retry = Some(tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    trace!("Delayed retry cancelled");
                }
                () = sleep(delay) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.fire_retry(epoch);
                    }
                }
            }
        }));
    }

    /// Delayed retry body.
    fn fire_retry(self: &Arc<Self>, epoch: u64) {
        let token = self.identity.token();
        let mut slot = self.slot.lock();

        if slot.retry_epoch != epoch {
            trace!(token, "Superseded delayed retry");
            return;
        }

        // This task is the pending retry; forget its handle.
        slot.retry = None;

        if slot.stopped {
            info!(token, "Client stopped, skipping delayed retry");
            return;
        }

        if slot.session.is_some() {
            debug!(token, "Session already active, skipping delayed retry");
            return;
        }

        info!(token, "Retrying connection");
        self.restart(&mut slot);
    }
}

// ============================================================================
// Tests
// ============================================================================
