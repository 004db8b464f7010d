//! Error types for ttylink-core.

use thiserror::Error;

/// Main error type for ttylink operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol violation.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Codec error while encoding or decoding a wire message.
    #[error("codec error: {message}")]
    Codec { message: String },

    /// Inbound message with an unassigned kind byte.
    #[error("unknown message kind: {0:#04x}")]
    UnknownKind(u8),

    /// Connection was closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Transport layer error.
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl Error {
    /// Returns true if this error must not terminate the current attempt.
    ///
    /// Per the forward-compatibility posture, a bad inbound message is
    /// dropped and the connection keeps running.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Codec { .. } | Error::UnknownKind(_))
    }
}

/// Convenience result type for ttylink operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_codec() {
        let err = Error::Codec {
            message: "empty message".into(),
        };
        assert_eq!(err.to_string(), "codec error: empty message");
    }

    #[test]
    fn error_display_unknown_kind() {
        let err = Error::UnknownKind(b'9');
        assert_eq!(err.to_string(), "unknown message kind: 0x39");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn recoverable_errors() {
        assert!(Error::Codec {
            message: "bad json".into()
        }
        .is_recoverable());
        assert!(Error::UnknownKind(b'9').is_recoverable());

        assert!(!Error::ConnectionClosed.is_recoverable());
        assert!(!Error::Transport {
            message: "lost".into()
        }
        .is_recoverable());
        assert!(!Error::Protocol {
            message: "bad".into()
        }
        .is_recoverable());
    }
}
