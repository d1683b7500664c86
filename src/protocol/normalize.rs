//! Vendor key normalization.
//!
//! Gotify namespaces its `extras` keys with `::` (`client::display`,
//! `android::action`, ...). Those are rewritten to plain identifiers over the
//! whole raw frame before it is parsed, so [`Extras`](super::Extras) can name
//! them as ordinary fields.
//!
//! The pass is a fixed, ordered list of literal substitutions. Its outputs
//! contain no `::`, so normalizing twice is the same as normalizing once.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;

// ============================================================================
// Constants
// ============================================================================

/// Literal substitutions, applied in order.
pub const KEY_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("client::display", "clientdisplay"),
    ("client::notification", "clientnotification"),
    ("android::action", "androidaction"),
];

// ============================================================================
// Functions
// ============================================================================

/// Rewrites punctuation-bearing vendor keys in a raw frame.
///
/// Returns the input unchanged (borrowed) when no substitution applies.
///
/// # Example
///
/// ```
/// use gotify_relay::protocol::normalize;
///
/// assert_eq!(
///     normalize(r#"{"client::display":{"x":1}}"#),
///     r#"{"clientdisplay":{"x":1}}"#
/// );
/// ```
#[must_use]
pub fn normalize(raw: &str) -> Cow<'_, str> {
    let mut text = Cow::Borrowed(raw);

    for (from, to) in KEY_SUBSTITUTIONS {
        if text.contains(from) {
            text = Cow::Owned(text.replace(from, to));
        }
    }

    text
}

// ============================================================================
// Tests
// ============================================================================
