//! Interactive terminal back-end on the local TTY.
//!
//! Provides raw-mode setup/restore, size detection, a SIGWINCH-driven
//! resize stream, and a one-row overlay for session messages. Input
//! capture maps to raw mode: `deactivate()` restores cooked mode and
//! `reset()` re-enters raw mode, so keystrokes typed while disconnected
//! stay with the local shell.

use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use ttylink_core::error::{Error, Result};
use ttylink_core::terminal::{Preferences, TermSize, Terminal, TerminalEvent};

/// Guard that holds the TTY in raw mode and restores it on drop.
pub struct RawModeGuard {
    fd: i32,
    original: libc::termios,
}

impl RawModeGuard {
    /// Enter raw terminal mode on stdin.
    pub fn enter() -> Result<Self> {
        let fd = io::stdin().as_raw_fd();

        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        let original = unsafe { termios.assume_init() };

        let mut raw = original;
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag |= libc::CS8;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;

        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } != 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        debug!("entered raw terminal mode");
        Ok(Self { fd, original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if unsafe { libc::tcsetattr(self.fd, libc::TCSAFLUSH, &self.original) } != 0 {
            warn!("failed to restore terminal settings");
        } else {
            debug!("restored terminal settings");
        }
    }
}

/// Probe the current terminal geometry, defaulting to 80x24 when stdout
/// is not a TTY.
pub fn terminal_size() -> TermSize {
    let fd = io::stdout().as_raw_fd();
    let mut winsize = std::mem::MaybeUninit::<libc::winsize>::uninit();
    if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, winsize.as_mut_ptr()) } != 0 {
        return TermSize::default();
    }
    let winsize = unsafe { winsize.assume_init() };
    if winsize.ws_col == 0 || winsize.ws_row == 0 {
        return TermSize::default();
    }
    TermSize {
        columns: winsize.ws_col,
        rows: winsize.ws_row,
    }
}

fn draw_overlay(message: &str) {
    let rows = terminal_size().rows;
    let mut out = io::stdout().lock();
    // Save cursor, repaint the bottom row in reverse video, restore.
    let _ = write!(out, "\x1b7\x1b[{rows};1H\x1b[2K\x1b[7m {message} \x1b[27m\x1b8");
    let _ = out.flush();
}

fn clear_overlay() {
    let rows = terminal_size().rows;
    let mut out = io::stdout().lock();
    let _ = write!(out, "\x1b7\x1b[{rows};1H\x1b[2K\x1b8");
    let _ = out.flush();
}

/// Interactive raw-mode terminal variant.
pub struct StdioTerminal {
    events: mpsc::UnboundedReceiver<TerminalEvent>,
    raw: Option<RawModeGuard>,
    /// Invalidates pending timed-overlay removals.
    message_seq: Arc<AtomicU64>,
    winch_task: tokio::task::JoinHandle<()>,
}

impl StdioTerminal {
    /// Enter raw mode and start the input and resize sources.
    ///
    /// Must be called within a tokio runtime.
    pub fn new() -> Result<Self> {
        let raw = RawModeGuard::enter()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        super::spawn_stdin_reader(events_tx.clone());

        let winch_task = tokio::spawn(async move {
            let mut winch = match signal(SignalKind::window_change()) {
                Ok(winch) => winch,
                Err(e) => {
                    warn!(error = %e, "cannot watch window size changes");
                    return;
                }
            };
            while winch.recv().await.is_some() {
                if events_tx
                    .send(TerminalEvent::Resize(terminal_size()))
                    .is_err()
                {
                    break;
                }
            }
        });

        Ok(Self {
            events: events_rx,
            raw: Some(raw),
            message_seq: Arc::new(AtomicU64::new(0)),
            winch_task,
        })
    }

    fn discard_pending_events(&mut self) {
        while self.events.try_recv().is_ok() {}
    }
}

impl Terminal for StdioTerminal {
    fn info(&self) -> TermSize {
        terminal_size()
    }

    fn output(&mut self, data: Bytes) -> Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(&data)?;
        out.flush()?;
        Ok(())
    }

    fn show_message(&mut self, message: &str, timeout: Option<Duration>) {
        let seq = self.message_seq.fetch_add(1, Ordering::SeqCst) + 1;
        draw_overlay(message);

        if let Some(timeout) = timeout {
            let message_seq = self.message_seq.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                // A newer message or removal owns the row now.
                if message_seq.load(Ordering::SeqCst) == seq {
                    clear_overlay();
                }
            });
        }
    }

    fn remove_message(&mut self) {
        self.message_seq.fetch_add(1, Ordering::SeqCst);
        clear_overlay();
    }

    fn set_window_title(&mut self, title: &str) {
        let mut out = io::stdout().lock();
        let _ = write!(out, "\x1b]2;{title}\x07");
        let _ = out.flush();
    }

    fn set_preferences(&mut self, preferences: &Preferences) {
        // The stdio back-end has no preference store.
        debug!(count = preferences.len(), "ignoring terminal preferences");
    }

    async fn next_event(&mut self) -> Option<TerminalEvent> {
        self.events.recv().await
    }

    fn reset(&mut self) {
        self.remove_message();
        // Input typed while disconnected belonged to the local shell.
        self.discard_pending_events();
        if self.raw.is_none() {
            match RawModeGuard::enter() {
                Ok(guard) => self.raw = Some(guard),
                Err(e) => warn!(error = %e, "cannot re-enter raw mode"),
            }
        }
    }

    fn deactivate(&mut self) {
        self.raw = None;
    }

    fn close(&mut self) {
        self.remove_message();
        self.raw = None;
        self.winch_task.abort();
    }
}

impl Drop for StdioTerminal {
    fn drop(&mut self) {
        self.winch_task.abort();
    }
}

// =============================================================================
// Tests
// =============================================================================
