//! Sequential message pipeline.
//!
//! Every running client owns one pipeline worker fed by an unbounded channel.
//! Successive sessions of the same client share the worker, so frames are
//! handled one at a time in arrival order across reconnects.
//!
//! # Steps
//!
//! | Step | Short-circuit |
//! |------|---------------|
//! | 1. Reject absent/blank frame | [`FrameOutcome::Blank`] |
//! | 2. Normalize vendor keys | |
//! | 3. Reject blank normalized text | [`FrameOutcome::BlankAfterNormalize`] |
//! | 4. Parse [`GotifyMessage`] | [`FrameOutcome::DecodeFailed`] |
//! | 5. Reject JSON `null` | [`FrameOutcome::Null`] |
//! | 6. Dispatch | [`FrameOutcome::DispatchFailed`] |
//!
//! No step raises. A panic inside a step (typically from a dispatcher) is
//! caught at the pipeline boundary and the worker moves on to the next frame.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::dispatch::Dispatcher;
use crate::protocol::{GotifyMessage, normalize};
use crate::transport::SessionHandle;

// ============================================================================
// Frame
// ============================================================================

/// One inbound frame and the session it arrived on.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame text. `None` for a binary frame that is not UTF-8.
    pub text: Option<String>,
    /// Originating session.
    pub session: SessionHandle,
}

// ============================================================================
// FrameOutcome
// ============================================================================

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameOutcome {
    /// Frame was absent or blank.
    Blank,
    /// Frame was blank after normalization.
    BlankAfterNormalize,
    /// Frame was not a Gotify message.
    DecodeFailed,
    /// Frame was JSON `null`.
    Null,
    /// Dispatcher accepted the message.
    Dispatched,
    /// Dispatcher returned an error.
    DispatchFailed,
    /// Processing panicked.
    Panicked,
}

impl FrameOutcome {
    /// Returns `true` if the dispatcher was called.
    #[inline]
    #[must_use]
    pub const fn reached_dispatch(self) -> bool {
        matches!(self, Self::Dispatched | Self::DispatchFailed)
    }
}

// ============================================================================
// MessagePipeline
// ============================================================================

/// Frame-to-dispatch transform for one client.
#[derive(Clone)]
pub struct MessagePipeline {
    /// Downstream collaborator.
    dispatcher: Arc<dyn Dispatcher>,
    /// Log converted frames and error chains.
    verbose: bool,
}

impl MessagePipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(dispatcher: Arc<dyn Dispatcher>, verbose: bool) -> Self {
        Self {
            dispatcher,
            verbose,
        }
    }

    /// Spawns the worker draining `frames` until the channel closes or
    /// `cancel` fires.
    ///
    /// Cancellation is observed between frames; a dispatch in flight runs to
    /// completion unless the task is aborted.
    pub(crate) fn spawn(
        self,
        mut frames: mpsc::UnboundedReceiver<Frame>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    frame = frames.recv() => match frame {
                        Some(frame) => frame,
                        None => break,
                    },
                };

                let outcome = self.handle(&frame).await;
                trace!(
                    token = frame.session.token(),
                    session_id = %frame.session.id(),
                    ?outcome,
                    "Frame processed"
                );
            }

            debug!("Pipeline worker terminated");
        })
    }

    /// Processes one frame, catching panics at the boundary.
    pub async fn handle(&self, frame: &Frame) -> FrameOutcome {
        match AssertUnwindSafe(self.process(frame)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                error!(
                    token = frame.session.token(),
                    kind = "panic",
                    panic = panic_message(payload.as_ref()),
                    "Unexpected failure while processing message"
                );
                if self.verbose {
                    error!(
                        token = frame.session.token(),
                        frame = frame.text.as_deref().unwrap_or_default(),
                        "Frame that caused the failure"
                    );
                }
                FrameOutcome::Panicked
            }
        }
    }

    /// Runs the pipeline steps for one frame.
    pub async fn process(&self, frame: &Frame) -> FrameOutcome {
        let token = frame.session.token();

        // 1. Absent or blank
        let Some(raw) = frame.text.as_deref().filter(|text| !text.trim().is_empty()) else {
            warn!(token, "Received null or empty message");
            return FrameOutcome::Blank;
        };

        // 2. Normalize
        let normalized = normalize(raw);
        if self.verbose {
            info!(token, converted = %normalized, "Message converted");
        }

        // 3. Blank after normalization
        if normalized.trim().is_empty() {
            warn!(token, raw, "Message is empty after normalization");
            return FrameOutcome::BlankAfterNormalize;
        }

        // 4. Parse
        let message = match GotifyMessage::parse(&normalized) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    token,
                    raw,
                    converted = %normalized,
                    error = %e,
                    "Failed to decode Gotify message"
                );
                if self.verbose {
                    debug!(token, chain = %error_chain(&e), "Decode error chain");
                }
                return FrameOutcome::DecodeFailed;
            }
        };

        // 5. Null
        let Some(message) = message else {
            warn!(token, converted = %normalized, "Gotify message decoded to null");
            return FrameOutcome::Null;
        };

        // 6. Dispatch
        debug!(token, session_id = %frame.session.id(), id = message.id, "Dispatching message");
        match self.dispatcher.dispatch(&message, &frame.session).await {
            Ok(()) => FrameOutcome::Dispatched,
            Err(e) => {
                error!(
                    token,
                    id = message.id,
                    title = %message.title,
                    error = %e,
                    "Failed to dispatch notification"
                );
                if self.verbose {
                    error!(token, chain = %error_chain(&e), "Dispatch error chain");
                }
                FrameOutcome::DispatchFailed
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Extracts the message of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

/// Joins an error and its sources into one line.
fn error_chain(err: &dyn StdError) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::error::{Error, Result};

    /// Records dispatched ids; fails or panics on chosen ids.
    #[derive(Default)]
    struct Recorder {
        ids: Mutex<Vec<u64>>,
        fail_on: Option<u64>,
        panic_on: Option<u64>,
    }

    #[async_trait]
    impl Dispatcher for Recorder {
        async fn dispatch(&self, message: &GotifyMessage, _session: &SessionHandle) -> Result<()> {
            if self.panic_on == Some(message.id) {
                panic!("dispatcher exploded on {}", message.id);
            }
            self.ids.lock().push(message.id);
            if self.fail_on == Some(message.id) {
                return Err(Error::dispatch("device unreachable"));
            }
            Ok(())
        }
    }

    fn frame(text: Option<&str>) -> Frame {
        Frame {
            text: text.map(str::to_owned),
            session: SessionHandle::detached("token"),
        }
    }

    fn pipeline(recorder: &Arc<Recorder>) -> MessagePipeline {
        MessagePipeline::new(Arc::clone(recorder) as Arc<dyn Dispatcher>, true)
    }

    #[tokio::test]
    async fn test_blank_frames_discarded() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(&recorder);

        assert_eq!(pipeline.handle(&frame(None)).await, FrameOutcome::Blank);
        assert_eq!(pipeline.handle(&frame(Some(""))).await, FrameOutcome::Blank);
        assert_eq!(pipeline.handle(&frame(Some(" \n\t"))).await, FrameOutcome::Blank);
        assert!(recorder.ids.lock().is_empty());
    }

    #[tokio::test]
    async fn test_decode_failure_dropped() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(&recorder);

        let outcome = pipeline.handle(&frame(Some("{\"id\":"))).await;
        assert_eq!(outcome, FrameOutcome::DecodeFailed);
        assert!(!outcome.reached_dispatch());
        assert!(recorder.ids.lock().is_empty());
    }

    #[tokio::test]
    async fn test_null_never_dispatched() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(&recorder);

        assert_eq!(pipeline.handle(&frame(Some("null"))).await, FrameOutcome::Null);
        assert!(recorder.ids.lock().is_empty());
    }

    #[tokio::test]
    async fn test_normalized_frame_dispatched() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(&recorder);

        let raw = r#"{"id":3,"title":"t","message":"m","extras":{"client::display":{"contentType":"text/markdown"}}}"#;
        assert_eq!(pipeline.handle(&frame(Some(raw))).await, FrameOutcome::Dispatched);
        assert_eq!(*recorder.ids.lock(), vec![3]);
    }

    #[tokio::test]
    async fn test_dispatch_failure_absorbed() {
        let recorder = Arc::new(Recorder {
            fail_on: Some(1),
            ..Default::default()
        });
        let pipeline = pipeline(&recorder);

        assert_eq!(
            pipeline.handle(&frame(Some(r#"{"id":1}"#))).await,
            FrameOutcome::DispatchFailed
        );
        assert_eq!(
            pipeline.handle(&frame(Some(r#"{"id":2}"#))).await,
            FrameOutcome::Dispatched
        );
        assert_eq!(*recorder.ids.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_panic_caught_at_boundary() {
        let recorder = Arc::new(Recorder {
            panic_on: Some(1),
            ..Default::default()
        });
        let pipeline = pipeline(&recorder);

        assert_eq!(
            pipeline.handle(&frame(Some(r#"{"id":1}"#))).await,
            FrameOutcome::Panicked
        );
        assert_eq!(
            pipeline.handle(&frame(Some(r#"{"id":2}"#))).await,
            FrameOutcome::Dispatched
        );
        assert_eq!(*recorder.ids.lock(), vec![2]);
    }

    #[tokio::test]
    async fn test_worker_preserves_order_past_bad_frames() {
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = pipeline(&recorder).spawn(rx, CancellationToken::new());

        for text in [r#"{"id":1}"#, "garbage", r#"{"id":2}"#, "null", r#"{"id":3}"#] {
            tx.send(frame(Some(text))).unwrap();
        }
        drop(tx);

        worker.await.unwrap();
        assert_eq!(*recorder.ids.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_worker_stops_on_cancel() {
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();

        tx.send(frame(Some(r#"{"id":1}"#))).unwrap();
        pipeline(&recorder).spawn(rx, cancel).await.unwrap();

        assert!(recorder.ids.lock().is_empty());
    }

    #[test]
    fn test_error_chain() {
        let json_err = serde_json::from_str::<u8>("x").unwrap_err();
        let err = Error::frame_decode(json_err);
        let chain = error_chain(&err);
        assert!(chain.starts_with("Frame decode error:"));
        assert!(chain.matches(':').count() >= 2);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
