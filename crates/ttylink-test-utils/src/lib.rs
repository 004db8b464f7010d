//! ttylink-test-utils: test infrastructure for ttylink.
//!
//! Provides:
//! - MockConnection/MockConnectionFactory: in-memory transport with a
//!   scripted remote end and a send log
//! - MockTerminal: recording terminal back-end with event injection

mod mock_connection;
mod mock_terminal;

pub use mock_connection::{
    mock_connection, mock_factory, MockConnection, MockConnectionFactory, MockFactoryHandle,
    MockRemote,
};
pub use mock_terminal::{mock_terminal, MockTerminal, MockTerminalHandle, TerminalRecord};
