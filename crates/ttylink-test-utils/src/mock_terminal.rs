//! Mock terminal for testing without a real TTY.
//!
//! Records every capability call the session controller makes and lets
//! the test script inject input and resize events.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use ttylink_core::error::Result;
use ttylink_core::terminal::{Preferences, TermSize, Terminal, TerminalEvent};

/// Everything the session controller did to the terminal, in order
/// within each category.
#[derive(Debug, Default)]
pub struct TerminalRecord {
    /// Output deliveries, undecoded concatenation available via helper.
    pub outputs: Vec<Bytes>,
    /// Overlay messages shown, with their timeout.
    pub messages: Vec<(String, Option<Duration>)>,
    /// Window titles set.
    pub titles: Vec<String>,
    /// Preference mappings applied.
    pub preferences: Vec<Preferences>,
    /// Number of `remove_message` calls.
    pub removals: usize,
    /// Number of `reset` calls.
    pub resets: usize,
    /// Number of `deactivate` calls.
    pub deactivations: usize,
    /// Whether `close` was called.
    pub closed: bool,
}

impl TerminalRecord {
    /// All delivered output bytes, concatenated.
    pub fn output_bytes(&self) -> Vec<u8> {
        self.outputs.iter().flat_map(|b| b.iter().copied()).collect()
    }
}

/// Recording [`Terminal`] implementation.
#[derive(Debug)]
pub struct MockTerminal {
    size: Arc<Mutex<TermSize>>,
    events: mpsc::UnboundedReceiver<TerminalEvent>,
    record: Arc<Mutex<TerminalRecord>>,
}

/// Test-side handle driving a [`MockTerminal`].
#[derive(Debug, Clone)]
pub struct MockTerminalHandle {
    size: Arc<Mutex<TermSize>>,
    events: mpsc::UnboundedSender<TerminalEvent>,
    record: Arc<Mutex<TerminalRecord>>,
}

/// Create a mock terminal with the given geometry and its driver handle.
pub fn mock_terminal(columns: u16, rows: u16) -> (MockTerminal, MockTerminalHandle) {
    let size = Arc::new(Mutex::new(TermSize { columns, rows }));
    let record = Arc::new(Mutex::new(TerminalRecord::default()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    (
        MockTerminal {
            size: size.clone(),
            events: events_rx,
            record: record.clone(),
        },
        MockTerminalHandle {
            size,
            events: events_tx,
            record,
        },
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Terminal for MockTerminal {
    fn info(&self) -> TermSize {
        *lock(&self.size)
    }

    fn output(&mut self, data: Bytes) -> Result<()> {
        lock(&self.record).outputs.push(data);
        Ok(())
    }

    fn show_message(&mut self, message: &str, timeout: Option<Duration>) {
        lock(&self.record)
            .messages
            .push((message.to_string(), timeout));
    }

    fn remove_message(&mut self) {
        lock(&self.record).removals += 1;
    }

    fn set_window_title(&mut self, title: &str) {
        lock(&self.record).titles.push(title.to_string());
    }

    fn set_preferences(&mut self, preferences: &Preferences) {
        lock(&self.record).preferences.push(preferences.clone());
    }

    async fn next_event(&mut self) -> Option<TerminalEvent> {
        self.events.recv().await
    }

    fn reset(&mut self) {
        lock(&self.record).resets += 1;
    }

    fn deactivate(&mut self) {
        lock(&self.record).deactivations += 1;
    }

    fn close(&mut self) {
        lock(&self.record).closed = true;
    }
}

impl MockTerminalHandle {
    /// Inject user input.
    pub fn input(&self, data: impl Into<String>) {
        let _ = self.events.send(TerminalEvent::Input(data.into()));
    }

    /// Change the geometry and emit the matching resize event.
    pub fn resize(&self, columns: u16, rows: u16) {
        let size = TermSize { columns, rows };
        *lock(&self.size) = size;
        let _ = self.events.send(TerminalEvent::Resize(size));
    }

    /// Run `f` over the current record.
    pub fn with_record<R>(&self, f: impl FnOnce(&TerminalRecord) -> R) -> R {
        f(&lock(&self.record))
    }

    /// All delivered output bytes, concatenated.
    pub fn output_bytes(&self) -> Vec<u8> {
        self.with_record(TerminalRecord::output_bytes)
    }

    /// Overlay messages shown so far.
    pub fn messages(&self) -> Vec<(String, Option<Duration>)> {
        self.with_record(|r| r.messages.clone())
    }

    /// Window titles set so far.
    pub fn titles(&self) -> Vec<String> {
        self.with_record(|r| r.titles.clone())
    }

    /// Number of `deactivate` calls so far.
    pub fn deactivations(&self) -> usize {
        self.with_record(|r| r.deactivations)
    }

    /// Number of `reset` calls so far.
    pub fn resets(&self) -> usize {
        self.with_record(|r| r.resets)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_capability_calls() {
        let (mut term, handle) = mock_terminal(80, 24);

        assert_eq!(term.info(), TermSize { columns: 80, rows: 24 });

        term.output(Bytes::from_static(b"hi")).unwrap();
        term.output(Bytes::from_static(b"!")).unwrap();
        term.set_window_title("title");
        term.show_message("Connection Closed", None);
        term.deactivate();
        term.reset();

        assert_eq!(handle.output_bytes(), b"hi!");
        assert_eq!(handle.titles(), vec!["title".to_string()]);
        assert_eq!(
            handle.messages(),
            vec![("Connection Closed".to_string(), None)]
        );
        assert_eq!(handle.deactivations(), 1);
        assert_eq!(handle.resets(), 1);
    }

    #[tokio::test]
    async fn injected_events_are_delivered_in_order() {
        let (mut term, handle) = mock_terminal(80, 24);

        handle.input("a");
        handle.resize(132, 43);

        assert_eq!(
            term.next_event().await,
            Some(TerminalEvent::Input("a".into()))
        );
        assert_eq!(
            term.next_event().await,
            Some(TerminalEvent::Resize(TermSize {
                columns: 132,
                rows: 43
            }))
        );
        // Geometry change is visible through info() as well.
        assert_eq!(term.info(), TermSize { columns: 132, rows: 43 });
    }

    #[tokio::test]
    async fn dropped_handle_ends_event_stream() {
        let (mut term, handle) = mock_terminal(80, 24);
        drop(handle);
        assert_eq!(term.next_event().await, None);
    }
}
