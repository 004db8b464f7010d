//! Mock connection for testing without real network.
//!
//! Provides an in-memory [`Connection`] whose remote end is driven
//! programmatically: the test script decides when the connection opens,
//! what the server sends, and when it closes, and observes every message
//! the client sent, in order.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use ttylink_core::connection::{Connection, ConnectionEvent, ConnectionFactory};
use ttylink_core::error::{Error, Result};

/// State shared between a [`MockConnection`] and its [`MockRemote`].
#[derive(Debug, Default)]
struct Shared {
    /// `open()` was invoked on the client side.
    open_requested: AtomicBool,
    /// The attempt has terminated (either side).
    closed: AtomicBool,
    /// `close()` was invoked on the client side.
    closed_by_client: AtomicBool,
}

/// Client side of an in-memory connection.
#[derive(Debug)]
pub struct MockConnection {
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    /// Used to self-deliver the close event on a local `close()`.
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    sent_tx: mpsc::UnboundedSender<String>,
    sent_log: Arc<Mutex<Vec<String>>>,
    shared: Arc<Shared>,
    closed_delivered: bool,
}

/// Scripted remote end of a [`MockConnection`].
#[derive(Debug)]
pub struct MockRemote {
    events: mpsc::UnboundedSender<ConnectionEvent>,
    sent_rx: mpsc::UnboundedReceiver<String>,
    sent_log: Arc<Mutex<Vec<String>>>,
    shared: Arc<Shared>,
}

/// Create a connected mock pair: the client half and its remote driver.
pub fn mock_connection() -> (MockConnection, MockRemote) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let sent_log = Arc::new(Mutex::new(Vec::new()));
    let shared = Arc::new(Shared::default());

    let connection = MockConnection {
        events: events_rx,
        events_tx: events_tx.clone(),
        sent_tx,
        sent_log: sent_log.clone(),
        shared: shared.clone(),
        closed_delivered: false,
    };
    let remote = MockRemote {
        events: events_tx,
        sent_rx,
        sent_log,
        shared,
    };
    (connection, remote)
}

impl Connection for MockConnection {
    fn open(&mut self) -> Result<()> {
        self.shared.open_requested.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.closed_by_client.store(true, Ordering::SeqCst);
        let _ = self.events_tx.send(ConnectionEvent::Closed);
    }

    fn send(&mut self, data: String) -> Result<()> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        self.sent_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(data.clone());
        let _ = self.sent_tx.send(data);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.shared.open_requested.load(Ordering::SeqCst)
            && !self.shared.closed.load(Ordering::SeqCst)
    }

    async fn next_event(&mut self) -> Option<ConnectionEvent> {
        if self.closed_delivered {
            return None;
        }
        let event = match self.events.recv().await {
            Some(event) => event,
            // Remote dropped without scripting a close: a transport failure.
            None => ConnectionEvent::Closed,
        };
        if event == ConnectionEvent::Closed {
            self.closed_delivered = true;
            self.shared.closed.store(true, Ordering::SeqCst);
        }
        Some(event)
    }
}

impl MockRemote {
    /// Accept the connect attempt: delivers the open event.
    pub fn accept(&self) {
        let _ = self.events.send(ConnectionEvent::Opened);
    }

    /// Deliver one inbound message.
    pub fn send(&self, data: impl Into<String>) {
        let _ = self.events.send(ConnectionEvent::Message(data.into()));
    }

    /// Close the connection from the remote end.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        let _ = self.events.send(ConnectionEvent::Closed);
    }

    /// Wait for the next client-to-server message.
    pub async fn recv(&mut self) -> Option<String> {
        self.sent_rx.recv().await
    }

    /// Snapshot of every message the client sent, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether the client invoked `open()`.
    pub fn open_requested(&self) -> bool {
        self.shared.open_requested.load(Ordering::SeqCst)
    }

    /// Whether the client closed the connection locally.
    pub fn closed_by_client(&self) -> bool {
        self.shared.closed_by_client.load(Ordering::SeqCst)
    }
}

/// Factory producing mock connections, one per attempt.
///
/// The paired [`MockFactoryHandle`] receives each attempt's [`MockRemote`]
/// as it is created, so the test script can drive successive attempts.
#[derive(Debug)]
pub struct MockConnectionFactory {
    remotes: mpsc::UnboundedSender<MockRemote>,
    created: Arc<AtomicUsize>,
}

/// Test-side handle over a [`MockConnectionFactory`].
#[derive(Debug)]
pub struct MockFactoryHandle {
    remotes: mpsc::UnboundedReceiver<MockRemote>,
    created: Arc<AtomicUsize>,
}

/// Create a factory and its test-side handle.
pub fn mock_factory() -> (MockConnectionFactory, MockFactoryHandle) {
    let (remotes_tx, remotes_rx) = mpsc::unbounded_channel();
    let created = Arc::new(AtomicUsize::new(0));
    (
        MockConnectionFactory {
            remotes: remotes_tx,
            created: created.clone(),
        },
        MockFactoryHandle {
            remotes: remotes_rx,
            created,
        },
    )
}

impl ConnectionFactory for MockConnectionFactory {
    type Conn = MockConnection;

    fn create(&mut self) -> MockConnection {
        self.created.fetch_add(1, Ordering::SeqCst);
        let (connection, remote) = mock_connection();
        let _ = self.remotes.send(remote);
        connection
    }
}

impl MockFactoryHandle {
    /// Wait for the next attempt's remote driver.
    pub async fn next_remote(&mut self) -> Option<MockRemote> {
        self.remotes.recv().await
    }

    /// Try to take the next attempt's remote without waiting.
    pub fn try_next_remote(&mut self) -> Option<MockRemote> {
        self.remotes.try_recv().ok()
    }

    /// How many connections the factory has produced.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Tests
// =============================================================================
