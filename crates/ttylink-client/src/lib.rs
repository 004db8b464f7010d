//! ttylink-client: client adapters for ttylink sessions.
//!
//! Provides:
//! - CLI argument parsing
//! - WebSocket connection factory and connection
//! - Two terminal back-ends (raw-mode stdio and plain pass-through)

pub mod cli;
pub mod term;
pub mod websocket;

pub use cli::{Cli, LogFormatArg, TermKind};
pub use term::{terminal_size, PlainTerminal, RawModeGuard, StdioTerminal};
pub use websocket::{endpoint_url, WsConnection, WsConnectionFactory};
