//! Connection capability contract.
//!
//! Abstracts over the persistent duplex channel carrying the session:
//! the real WebSocket transport in ttylink-client, and in-memory mocks
//! in ttylink-test-utils. The callback registration of the underlying
//! socket APIs (open/message/close handlers) is modeled as a pulled
//! event stream so the session controller stays a single linear loop.

use std::future::Future;

use crate::error::Result;

/// A lifecycle or data event emitted by a [`Connection`].
///
/// Per attempt, `Opened` and `Closed` each occur at most once, and
/// `Closed` is terminal. `Message` events arrive in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connect attempt succeeded.
    Opened,
    /// One inbound message.
    Message(String),
    /// The connection terminated, from either end or transport failure.
    Closed,
}

/// A persistent duplex channel carrying one attempt of a session.
pub trait Connection: Send {
    /// Begin connecting. Events are reported through [`Connection::next_event`].
    fn open(&mut self) -> Result<()>;

    /// Terminate the connection. Idempotent from the caller's view.
    fn close(&mut self);

    /// Transmit one message. No delivery confirmation.
    fn send(&mut self, data: String) -> Result<()>;

    /// True while connecting or open.
    fn is_open(&self) -> bool;

    /// Wait for the next connection event.
    ///
    /// Returns `None` after `Closed` has been delivered. Must be
    /// cancel-safe: dropping the future before completion loses no event.
    fn next_event(&mut self) -> impl Future<Output = Option<ConnectionEvent>> + Send;
}

/// Produces a fresh [`Connection`] bound to a fixed endpoint and
/// sub-protocol list; invoked once per connection attempt.
pub trait ConnectionFactory: Send {
    /// The connection type produced by this factory.
    type Conn: Connection;

    /// Create an independent, not-yet-opened connection.
    fn create(&mut self) -> Self::Conn;
}
