//! Terminal capability contract.
//!
//! The session controller drives a terminal back-end only through this
//! trait. Two interchangeable variants live in ttylink-client (raw-mode
//! stdio and plain pipe output); ttylink-test-utils provides a recording
//! mock. Input and resize callbacks are modeled as a pulled event stream,
//! matching the connection contract.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COLS, DEFAULT_ROWS};
use crate::error::Result;

/// Terminal geometry in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSize {
    /// Number of columns.
    pub columns: u16,
    /// Number of rows.
    pub rows: u16,
}

impl Default for TermSize {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }
}

/// A user-originated event emitted by a [`Terminal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// Keystroke or paste data to forward to the server.
    Input(String),
    /// The terminal geometry changed.
    Resize(TermSize),
}

/// Opaque preference mapping delivered by the server.
///
/// Keys are implementation-defined by the terminal back-end; the session
/// controller never interprets them.
pub type Preferences = serde_json::Map<String, serde_json::Value>;

/// A terminal rendering back-end.
pub trait Terminal: Send {
    /// Current terminal geometry.
    fn info(&self) -> TermSize;

    /// Render output bytes.
    fn output(&mut self, data: Bytes) -> Result<()>;

    /// Show an overlay message. `None` timeout means persistent.
    fn show_message(&mut self, message: &str, timeout: Option<Duration>);

    /// Remove any shown overlay message.
    fn remove_message(&mut self);

    /// Set the window title.
    fn set_window_title(&mut self, title: &str);

    /// Apply a server-provided preference mapping.
    fn set_preferences(&mut self, preferences: &Preferences);

    /// Wait for the next input or resize event.
    ///
    /// Returns `None` when the back-end can produce no further events.
    /// Must be cancel-safe: dropping the future before completion loses
    /// no event.
    fn next_event(&mut self) -> impl Future<Output = Option<TerminalEvent>> + Send;

    /// Clear any shown message and re-arm input capture.
    fn reset(&mut self);

    /// Stop forwarding input/resize events and release input capture.
    fn deactivate(&mut self);

    /// Permanent teardown.
    fn close(&mut self);
}
