//! Gotify stream message types.
//!
//! Each text frame on `/stream` carries one message:
//!
//! ```json
//! {
//!   "id": 25,
//!   "appid": 5,
//!   "message": "Backup finished",
//!   "title": "nightly",
//!   "priority": 5,
//!   "date": "2026-10-14T02:00:00Z",
//!   "extras": {
//!     "client::display": { "contentType": "text/markdown" },
//!     "client::notification": { "click": { "url": "https://example.com" } }
//!   }
//! }
//! ```
//!
//! Frames are normalized first (see `protocol::normalize`), so the
//! vendor keys arrive here as `clientdisplay`, `clientnotification` and
//! `androidaction`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// GotifyMessage
// ============================================================================

/// A parsed Gotify message.
///
/// Only `id` is required; the remaining fields default when absent.
///
/// A lenient JSON reader would accept `{}` or `{"title": ".."}` as a message
/// with id 0. Here those frames fail to parse and are dropped, since every
/// real Gotify message carries a server-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GotifyMessage {
    /// Message id on the Gotify server.
    pub id: u64,

    /// Id of the application that sent the message.
    #[serde(default)]
    pub appid: u64,

    /// Message body.
    #[serde(default)]
    pub message: String,

    /// Message title.
    #[serde(default)]
    pub title: String,

    /// Priority, 0-10 by convention.
    #[serde(default)]
    pub priority: i64,

    /// Server timestamp as sent.
    #[serde(default)]
    pub date: Option<String>,

    /// Vendor metadata.
    #[serde(default)]
    pub extras: Option<Extras>,
}

impl GotifyMessage {
    /// Parses a normalized frame.
    ///
    /// Returns `Ok(None)` for a frame that is valid JSON `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameDecode`] if the text is not a Gotify message.
    pub fn parse(text: &str) -> Result<Option<Self>> {
        serde_json::from_str(text).map_err(Error::frame_decode)
    }

    /// Returns the markdown/plain content type requested by the sender.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.extras
            .as_ref()?
            .client_display
            .as_ref()?
            .content_type
            .as_deref()
    }

    /// Returns the URL to open when the notification is tapped.
    #[must_use]
    pub fn click_url(&self) -> Option<&str> {
        self.extras
            .as_ref()?
            .client_notification
            .as_ref()?
            .click
            .as_ref()?
            .url
            .as_deref()
    }
}

// ============================================================================
// Extras
// ============================================================================

/// Vendor metadata attached to a message, after key normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extras {
    /// `client::display` namespace.
    #[serde(rename = "clientdisplay", default, skip_serializing_if = "Option::is_none")]
    pub client_display: Option<ClientDisplay>,

    /// `client::notification` namespace.
    #[serde(
        rename = "clientnotification",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_notification: Option<ClientNotification>,

    /// `android::action` namespace.
    #[serde(rename = "androidaction", default, skip_serializing_if = "Option::is_none")]
    pub android_action: Option<AndroidAction>,

    /// Any other namespaces, kept verbatim.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// `client::display` extras.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDisplay {
    /// `text/plain` or `text/markdown`.
    #[serde(rename = "contentType", default)]
    pub content_type: Option<String>,
}

/// `client::notification` extras.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientNotification {
    /// Action when the notification is tapped.
    #[serde(default)]
    pub click: Option<ClickAction>,

    /// Image shown in the expanded notification.
    #[serde(rename = "bigImageUrl", default)]
    pub big_image_url: Option<String>,
}

/// Tap action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickAction {
    /// URL to open.
    #[serde(default)]
    pub url: Option<String>,
}

/// `android::action` extras.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidAction {
    /// Intent fired when the message is received.
    #[serde(rename = "onReceive", default)]
    pub on_receive: Option<IntentAction>,
}

/// Intent target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentAction {
    /// Intent URL.
    #[serde(rename = "intentUrl", default)]
    pub intent_url: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
