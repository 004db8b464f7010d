//! Protocol and configuration constants for ttylink.

use std::time::Duration;

// =============================================================================
// Wire Protocol Constants
// =============================================================================

/// Sub-protocol identifier negotiated with the server.
pub const SUBPROTOCOL: &str = "ttylink";

/// Path suffix appended to the endpoint base path.
pub const ENDPOINT_PATH_SUFFIX: &str = "ws";

/// Outbound kind byte: raw terminal input.
pub const MSG_INPUT: u8 = b'1';

/// Outbound kind byte: keepalive ping (empty payload).
pub const MSG_PING: u8 = b'2';

/// Outbound kind byte: terminal resize (JSON payload).
pub const MSG_RESIZE: u8 = b'3';

/// Inbound kind byte: base64-encoded terminal output.
pub const MSG_OUTPUT: u8 = b'1';

/// Inbound kind byte: keepalive acknowledgment (empty payload).
pub const MSG_PONG: u8 = b'2';

/// Inbound kind byte: window title (raw text payload).
pub const MSG_SET_WINDOW_TITLE: u8 = b'3';

/// Inbound kind byte: terminal preferences (JSON object payload).
pub const MSG_SET_PREFERENCES: u8 = b'4';

/// Inbound kind byte: reconnect interval in seconds (JSON number payload).
pub const MSG_SET_RECONNECT: u8 = b'5';

// =============================================================================
// Timing Constants
// =============================================================================

/// Keepalive ping period, chosen to defeat idle timeouts in intermediaries.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Reconnect interval sentinel: non-positive disables reconnection.
pub const RECONNECT_DISABLED: f64 = -1.0;

// =============================================================================
// Default Values
// =============================================================================

/// Default terminal columns.
pub const DEFAULT_COLS: u16 = 80;

/// Default terminal rows.
pub const DEFAULT_ROWS: u16 = 24;

/// Overlay message shown when the connection drops.
pub const CLOSED_MESSAGE: &str = "Connection Closed";
