//! Kind-prefixed text codec for ttylink messages.
//!
//! Format: one kind byte, then a kind-specific payload. The transport
//! preserves message boundaries, so no length prefix is needed.
//!
//! The codec is pure and stateless; every call is independent and
//! bit-exact. Unknown inbound kinds decode to [`Error::UnknownKind`] so
//! the caller can ignore them without tearing the connection down.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;

use crate::constants::{
    MSG_INPUT, MSG_OUTPUT, MSG_PING, MSG_PONG, MSG_RESIZE, MSG_SET_PREFERENCES,
    MSG_SET_RECONNECT, MSG_SET_WINDOW_TITLE,
};
use crate::error::{Error, Result};
use crate::protocol::{ClientMessage, Handshake, ServerMessage};
use crate::terminal::Preferences;

/// Codec for kind-prefixed encoding of session messages.
pub struct Codec;

impl Codec {
    /// Encode an outbound message.
    pub fn encode(msg: &ClientMessage) -> Result<String> {
        match msg {
            ClientMessage::Input(data) => {
                let mut out = String::with_capacity(1 + data.len());
                out.push(MSG_INPUT as char);
                out.push_str(data);
                Ok(out)
            }
            ClientMessage::Ping => Ok((MSG_PING as char).to_string()),
            ClientMessage::Resize(size) => {
                let payload = serde_json::to_string(size).map_err(|e| Error::Codec {
                    message: format!("resize serialization failed: {e}"),
                })?;
                Ok(format!("{}{payload}", MSG_RESIZE as char))
            }
        }
    }

    /// Encode the handshake message (unframed JSON, no kind byte).
    pub fn encode_handshake(handshake: &Handshake) -> Result<String> {
        serde_json::to_string(handshake).map_err(|e| Error::Codec {
            message: format!("handshake serialization failed: {e}"),
        })
    }

    /// Decode an inbound message.
    ///
    /// Returns [`Error::UnknownKind`] for unassigned kind bytes and
    /// [`Error::Codec`] for malformed payloads; both are recoverable and
    /// the caller drops the single offending message.
    pub fn decode(data: &str) -> Result<ServerMessage> {
        let Some(&kind) = data.as_bytes().first() else {
            return Err(Error::Codec {
                message: "empty message".into(),
            });
        };
        // A non-ASCII lead byte can't be a kind byte, and slicing past it
        // would split a UTF-8 sequence.
        if !kind.is_ascii() {
            return Err(Error::UnknownKind(kind));
        }
        let payload = &data[1..];

        match kind {
            MSG_OUTPUT => {
                let bytes = BASE64.decode(payload).map_err(|e| Error::Codec {
                    message: format!("invalid base64 output payload: {e}"),
                })?;
                Ok(ServerMessage::Output(Bytes::from(bytes)))
            }
            MSG_PONG => Ok(ServerMessage::Pong),
            MSG_SET_WINDOW_TITLE => Ok(ServerMessage::SetWindowTitle(payload.to_string())),
            MSG_SET_PREFERENCES => {
                let preferences: Preferences =
                    serde_json::from_str(payload).map_err(|e| Error::Codec {
                        message: format!("invalid preferences payload: {e}"),
                    })?;
                Ok(ServerMessage::SetPreferences(preferences))
            }
            MSG_SET_RECONNECT => {
                let seconds: f64 = serde_json::from_str(payload).map_err(|e| Error::Codec {
                    message: format!("invalid reconnect payload: {e}"),
                })?;
                Ok(ServerMessage::SetReconnect(seconds))
            }
            other => Err(Error::UnknownKind(other)),
        }
    }
}
