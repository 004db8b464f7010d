//! Protocol message definitions.
//!
//! Every non-handshake message is a single kind byte followed by a
//! kind-specific payload. The handshake is an unframed JSON object sent
//! exactly once per attempt, immediately after the connection opens.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::terminal::{Preferences, TermSize};

/// Handshake sent as the very first message on every attempt.
///
/// Field names are fixed by the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// Session parameters, query-string style.
    #[serde(rename = "Arguments")]
    pub arguments: String,
    /// Opaque authentication token.
    #[serde(rename = "AuthToken")]
    pub auth_token: String,
}

/// Client-to-server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Raw keystroke/paste data, forwarded unmodified.
    Input(String),
    /// Keepalive ping, empty payload.
    Ping,
    /// Terminal geometry update.
    Resize(TermSize),
}

/// Server-to-client message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Terminal output bytes (base64-encoded on the wire).
    Output(Bytes),
    /// Keepalive acknowledgment.
    Pong,
    /// New window title, verbatim.
    SetWindowTitle(String),
    /// Terminal preference mapping, opaque keys.
    SetPreferences(Preferences),
    /// Reconnect interval in seconds; non-positive disables reconnection.
    SetReconnect(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_wire_field_names() {
        let handshake = Handshake {
            arguments: "?rows=24".into(),
            auth_token: "secret".into(),
        };
        let json = serde_json::to_string(&handshake).unwrap();
        assert_eq!(json, r#"{"Arguments":"?rows=24","AuthToken":"secret"}"#);
    }

    #[test]
    fn handshake_roundtrip() {
        let handshake = Handshake {
            arguments: String::new(),
            auth_token: "t0k3n".into(),
        };
        let json = serde_json::to_string(&handshake).unwrap();
        let back: Handshake = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handshake);
    }
}
