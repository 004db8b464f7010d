//! Non-interactive terminal back-end.
//!
//! Writes session output verbatim to stdout and surfaces titles and
//! messages as log lines. Suited to piping a session into a file or a
//! pager; there is no raw mode, no overlay, and no resize source.

use std::io::{self, Write};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info};

use ttylink_core::error::Result;
use ttylink_core::terminal::{Preferences, TermSize, Terminal, TerminalEvent};

/// Parse a geometry from `COLUMNS`/`LINES`-style values.
fn size_from_env(columns: Option<String>, lines: Option<String>) -> TermSize {
    let fallback = TermSize::default();
    TermSize {
        columns: columns
            .and_then(|v| v.parse().ok())
            .filter(|&c| c > 0)
            .unwrap_or(fallback.columns),
        rows: lines
            .and_then(|v| v.parse().ok())
            .filter(|&r| r > 0)
            .unwrap_or(fallback.rows),
    }
}

/// Pass-through terminal variant for non-TTY use.
#[derive(Debug)]
pub struct PlainTerminal {
    events: mpsc::UnboundedReceiver<TerminalEvent>,
    size: TermSize,
}

impl PlainTerminal {
    /// Create the back-end; geometry comes from `COLUMNS`/`LINES` with
    /// an 80x24 fallback and stays fixed for the session.
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        super::spawn_stdin_reader(events_tx);
        Self {
            events: events_rx,
            size: size_from_env(std::env::var("COLUMNS").ok(), std::env::var("LINES").ok()),
        }
    }
}

impl Default for PlainTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for PlainTerminal {
    fn info(&self) -> TermSize {
        self.size
    }

    fn output(&mut self, data: Bytes) -> Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(&data)?;
        out.flush()?;
        Ok(())
    }

    fn show_message(&mut self, message: &str, _timeout: Option<Duration>) {
        info!(message, "session message");
    }

    fn remove_message(&mut self) {}

    fn set_window_title(&mut self, title: &str) {
        info!(title, "window title");
    }

    fn set_preferences(&mut self, preferences: &Preferences) {
        debug!(count = preferences.len(), "ignoring terminal preferences");
    }

    async fn next_event(&mut self) -> Option<TerminalEvent> {
        self.events.recv().await
    }

    fn reset(&mut self) {
        while self.events.try_recv().is_ok() {}
    }

    fn deactivate(&mut self) {}

    fn close(&mut self) {}
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_from_env_parses_valid_values() {
        let size = size_from_env(Some("132".into()), Some("43".into()));
        assert_eq!(size, TermSize { columns: 132, rows: 43 });
    }

    #[test]
    fn size_from_env_falls_back_per_axis() {
        let size = size_from_env(Some("132".into()), None);
        assert_eq!(size, TermSize { columns: 132, rows: 24 });

        let size = size_from_env(Some("garbage".into()), Some("0".into()));
        assert_eq!(size, TermSize::default());
    }
}
