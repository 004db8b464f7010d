//! ttylink-core: session protocol and reconnect state machine.
//!
//! This crate provides:
//! - Wire message definitions and the kind-prefixed text codec
//! - The session controller (connect, handshake, dispatch, keepalive,
//!   reconnect policy)
//! - Capability contracts for the terminal back-end and the socket
//!   transport, which live in ttylink-client
//! - Error types and logging setup

pub mod connection;
pub mod constants;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod terminal;

pub use connection::{Connection, ConnectionEvent, ConnectionFactory};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat};
pub use session::{ReconnectPolicy, Session, SessionCloser, SessionHandle};
pub use terminal::{Preferences, TermSize, Terminal, TerminalEvent};
