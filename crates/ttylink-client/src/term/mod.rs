//! Terminal back-ends.
//!
//! Two interchangeable variants behind the core's `Terminal` contract:
//! - [`StdioTerminal`]: interactive raw-mode terminal on the local TTY
//! - [`PlainTerminal`]: non-interactive pass-through for pipes/recording

mod plain;
mod stdio;

pub use plain::PlainTerminal;
pub use stdio::{terminal_size, RawModeGuard, StdioTerminal};

use std::io::Read;

use tokio::sync::mpsc;
use tracing::debug;

use ttylink_core::terminal::TerminalEvent;

/// Spawn the blocking stdin reader thread shared by both variants.
///
/// Reads chunks from stdin and forwards them as input events; exits on
/// EOF or once the receiving side is gone.
pub(crate) fn spawn_stdin_reader(events: mpsc::UnboundedSender<TerminalEvent>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdin = stdin.lock();
        let mut buf = [0u8; 4096];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) => {
                    debug!("stdin EOF");
                    break;
                }
                Ok(n) => {
                    let input = String::from_utf8_lossy(&buf[..n]).into_owned();
                    if events.send(TerminalEvent::Input(input)).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!(error = %e, "stdin read error");
                    break;
                }
            }
        }
        debug!("stdin reader thread exiting");
    });
}
