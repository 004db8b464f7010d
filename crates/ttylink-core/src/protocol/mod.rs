//! Wire protocol for ttylink sessions.
//!
//! Message definitions and the kind-prefixed text codec.

mod codec;
mod message;

pub use codec::Codec;
pub use message::{ClientMessage, Handshake, ServerMessage};
