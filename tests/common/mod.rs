//! Shared utilities for integration tests.
//!
//! Provides:
//! - A scripted local Gotify stream server
//! - A recording dispatcher
//! - Logging initialization and polling helpers

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use gotify_relay::{ClientOptions, Dispatcher, GotifyMessage, Result, SessionHandle};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{HeaderMap, StatusCode};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Logging
// ============================================================================

/// Initialize tracing for a test. Safe to call from every test.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gotify_relay=debug")),
        )
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Options with timings short enough for tests.
pub fn fast_options() -> ClientOptions {
    ClientOptions::new()
        .with_retry_delay(Duration::from_millis(200))
        .with_close_grace(Duration::from_millis(50))
        .with_connect_timeout(Duration::from_secs(2))
}

/// Polls `condition` every 10ms until it holds or `within` elapses.
pub async fn wait_until(within: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ============================================================================
// Behavior
// ============================================================================

/// What the server does with one accepted connection.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Push frames, then stay open until the client leaves.
    Push(Vec<String>),
    /// Push frames, then send a close frame.
    PushThenClose(Vec<String>),
    /// Push frames, then drop the TCP stream without a close handshake.
    PushThenDrop(Vec<String>),
    /// Upgrade, then never read or write.
    Silent,
    /// Refuse the upgrade with 403.
    Reject,
}

// ============================================================================
// MockGotify
// ============================================================================

/// Local WebSocket server speaking the Gotify stream protocol.
///
/// Connection `n` follows `script[n]`; once the script runs out the last
/// behavior repeats.
pub struct MockGotify {
    /// Bound port.
    port: u16,
    /// TCP connections accepted.
    accepts: Arc<AtomicUsize>,
    /// Handshake headers per upgrade attempt.
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    /// Close frames received from clients as (code, reason).
    closes: Arc<Mutex<Vec<(u16, String)>>>,
    /// Accept loop.
    task: JoinHandle<()>,
}

impl MockGotify {
    /// Binds a server applying one behavior to every connection.
    pub async fn bind(behavior: Behavior) -> Self {
        Self::scripted(vec![behavior]).await
    }

    /// Binds a server following `script`.
    pub async fn scripted(script: Vec<Behavior>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let accepts = Arc::new(AtomicUsize::new(0));
        let headers = Arc::new(Mutex::new(Vec::new()));
        let closes = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn({
            let accepts = Arc::clone(&accepts);
            let headers = Arc::clone(&headers);
            let closes = Arc::clone(&closes);
            let mut script: VecDeque<_> = script.into();

            async move {
                while let Ok((stream, _addr)) = listener.accept().await {
                    accepts.fetch_add(1, Ordering::SeqCst);

                    let behavior = if script.len() > 1 {
                        script.pop_front()
                    } else {
                        script.front().cloned()
                    };
                    let Some(behavior) = behavior else { continue };

                    tokio::spawn(serve(
                        stream,
                        behavior,
                        Arc::clone(&headers),
                        Arc::clone(&closes),
                    ));
                }
            }
        });

        Self {
            port,
            accepts,
            headers,
            closes,
            task,
        }
    }

    /// Returns the stream URL for a token.
    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://127.0.0.1:{}/stream?token={token}", self.port)
    }

    /// Returns the number of TCP connections accepted so far.
    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    /// Returns the handshake headers seen so far.
    pub fn headers(&self) -> Vec<HeaderMap> {
        self.headers.lock().clone()
    }

    /// Returns the close frames received so far.
    pub fn closes(&self) -> Vec<(u16, String)> {
        self.closes.lock().clone()
    }
}

impl Drop for MockGotify {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serves one connection.
async fn serve(
    stream: TcpStream,
    behavior: Behavior,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    closes: Arc<Mutex<Vec<(u16, String)>>>,
) {
    let reject = matches!(behavior, Behavior::Reject);
    let callback = move |request: &Request, response: Response| {
        headers.lock().push(request.headers().clone());
        if reject {
            let mut denied = ErrorResponse::new(Some("forbidden".to_owned()));
            *denied.status_mut() = StatusCode::FORBIDDEN;
            return Err(denied);
        }
        Ok(response)
    };

    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };

    let frames = match &behavior {
        Behavior::Push(frames) | Behavior::PushThenClose(frames) | Behavior::PushThenDrop(frames) => {
            frames.clone()
        }
        Behavior::Silent => {
            sleep(Duration::from_secs(30)).await;
            return;
        }
        Behavior::Reject => return,
    };

    for frame in frames {
        if ws.send(Message::text(frame)).await.is_err() {
            return;
        }
    }

    match behavior {
        Behavior::PushThenDrop(_) => {
            // Let the frames reach the client before the reset
            let _ = ws.flush().await;
            sleep(Duration::from_millis(50)).await;
            drop(ws);
        }
        Behavior::PushThenClose(_) => {
            let _ = ws.close(None).await;
            while let Some(Ok(_)) = ws.next().await {}
        }
        _ => {
            while let Some(message) = ws.next().await {
                match message {
                    Ok(Message::Close(frame)) => {
                        if let Some(frame) = frame {
                            closes
                                .lock()
                                .push((u16::from(frame.code), frame.reason.as_str().to_owned()));
                        }
                        break;
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        }
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// Dispatcher recording every message it receives.
#[derive(Default)]
pub struct Recorder {
    /// Received (token, message) pairs in dispatch order.
    seen: Mutex<Vec<(String, GotifyMessage)>>,
    /// Artificial dispatch latency per message id.
    delays: FxHashMap<u64, Duration>,
}

impl Recorder {
    /// Creates a recorder with no delays.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a recorder that sleeps before recording the given ids.
    pub fn with_delays(delays: &[(u64, Duration)]) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::default(),
            delays: delays.iter().copied().collect(),
        })
    }

    /// Returns the ids received, in order.
    pub fn ids(&self) -> Vec<u64> {
        self.seen.lock().iter().map(|(_, m)| m.id).collect()
    }

    /// Returns the messages received, in order.
    pub fn messages(&self) -> Vec<GotifyMessage> {
        self.seen.lock().iter().map(|(_, m)| m.clone()).collect()
    }

    /// Returns the tokens of the sessions that delivered each message.
    pub fn tokens(&self) -> Vec<String> {
        self.seen.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Returns the number of messages received.
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl Dispatcher for Recorder {
    async fn dispatch(&self, message: &GotifyMessage, session: &SessionHandle) -> Result<()> {
        if let Some(delay) = self.delays.get(&message.id) {
            sleep(*delay).await;
        }
        self.seen
            .lock()
            .push((session.token().to_owned(), message.clone()));
        Ok(())
    }
}

/// Serializes a minimal Gotify message frame.
pub fn message_frame(id: u64, title: &str) -> String {
    serde_json::json!({
        "id": id,
        "appid": 1,
        "message": format!("body {id}"),
        "title": title,
        "priority": 5,
        "date": "2024-05-01T10:00:00Z",
    })
    .to_string()
}
