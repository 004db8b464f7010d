//! Session controller: one logical session across many physical attempts.
//!
//! The controller owns the `CONNECTING -> OPEN -> CLOSED` state machine of
//! each attempt and the reconnect policy that bridges attempts. All work
//! runs as a single sequential task; connection events, terminal events,
//! keepalive ticks, and cancellation are merged through one `select!` per
//! state, so there is never more than one live attempt and never a lock.
//!
//! Ordering invariant: the handshake is the first message sent on every
//! attempt. Terminal events are not polled until the handshake and the
//! initial resize have been queued, so input can never overtake them.

use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::connection::{Connection, ConnectionEvent, ConnectionFactory};
use crate::constants::{CLOSED_MESSAGE, KEEPALIVE_INTERVAL};
use crate::error::{Error, Result};
use crate::protocol::{ClientMessage, Codec, Handshake, ServerMessage};
use crate::session::ReconnectPolicy;
use crate::terminal::{Terminal, TerminalEvent};

/// How an attempt ended.
enum AttemptOutcome {
    /// The connection closed (either end, or transport failure).
    Closed,
    /// The session's close capability was invoked.
    Cancelled,
}

/// Event merged from all attempt inputs while `OPEN`.
enum OpenEvent {
    Cancelled,
    KeepaliveTick,
    Terminal(Option<TerminalEvent>),
    Connection(Option<ConnectionEvent>),
}

/// One logical terminal session over a reconnecting connection.
///
/// Created once, then consumed by [`Session::open`], which returns the
/// session's close capability. Re-opening after a permanent close means
/// constructing a new `Session`.
pub struct Session<T, F> {
    terminal: T,
    factory: F,
    arguments: String,
    auth_token: String,
    policy: ReconnectPolicy,
}

impl<T, F> Session<T, F>
where
    T: Terminal + 'static,
    F: ConnectionFactory + 'static,
{
    /// Create a session bound to a terminal back-end and a connection
    /// factory. Reconnection starts disabled; the server assigns an
    /// interval mid-session via a set-reconnect message.
    pub fn new(
        terminal: T,
        factory: F,
        arguments: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            terminal,
            factory,
            arguments: arguments.into(),
            auth_token: auth_token.into(),
            policy: ReconnectPolicy::disabled(),
        }
    }

    /// Begin the session and return its close capability.
    pub fn open(self) -> SessionHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        SessionHandle { cancel, task }
    }

    /// Drive the session until it closes permanently or is cancelled.
    ///
    /// Exposed separately from [`Session::open`] so callers can embed the
    /// controller in their own task structure.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        loop {
            match self.run_attempt(&cancel).await? {
                AttemptOutcome::Cancelled => {
                    debug!("session cancelled");
                    return Ok(());
                }
                AttemptOutcome::Closed => {
                    let Some(delay) = self.policy.delay() else {
                        info!("connection closed, reconnect disabled");
                        return Ok(());
                    };
                    info!(delay_secs = self.policy.interval_secs(), "scheduling reconnect");
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("reconnect cancelled");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    self.terminal.reset();
                }
            }
        }
    }

    /// Run one attempt: `CONNECTING -> OPEN -> CLOSED`.
    async fn run_attempt(&mut self, cancel: &CancellationToken) -> Result<AttemptOutcome> {
        let mut conn = self.factory.create();
        conn.open()?;
        debug!("attempt connecting");

        // CONNECTING: wait for the open event. A close here (refused or
        // failed connect) takes the same path as a mid-session close.
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => None,
                event = conn.next_event() => Some(event),
            };
            match event {
                None => return Ok(self.teardown(conn)),
                Some(Some(ConnectionEvent::Opened)) => break,
                Some(Some(ConnectionEvent::Message(_))) => {
                    warn!("dropping message received before open");
                }
                Some(Some(ConnectionEvent::Closed)) | Some(None) => {
                    return Ok(self.on_close());
                }
            }
        }

        // CONNECTING -> OPEN: handshake strictly first, then the initial
        // geometry so the server learns it even if the user never resizes.
        debug!("attempt open, sending handshake");
        let handshake = Codec::encode_handshake(&Handshake {
            arguments: self.arguments.clone(),
            auth_token: self.auth_token.clone(),
        })?;
        try_send(&mut conn, handshake);
        try_send(
            &mut conn,
            Codec::encode(&ClientMessage::Resize(self.terminal.info()))?,
        );

        let mut keepalive = interval_at(
            Instant::now() + KEEPALIVE_INTERVAL,
            KEEPALIVE_INTERVAL,
        );
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // OPEN: merge all inputs, then dispatch with borrows released.
        let mut terminal_done = false;
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => OpenEvent::Cancelled,
                _ = keepalive.tick() => OpenEvent::KeepaliveTick,
                event = self.terminal.next_event(), if !terminal_done => {
                    OpenEvent::Terminal(event)
                }
                event = conn.next_event() => OpenEvent::Connection(event),
            };

            match event {
                OpenEvent::Cancelled => return Ok(self.teardown(conn)),
                OpenEvent::KeepaliveTick => {
                    trace!("keepalive ping");
                    try_send(&mut conn, Codec::encode(&ClientMessage::Ping)?);
                }
                OpenEvent::Terminal(Some(TerminalEvent::Input(input))) => {
                    try_send(&mut conn, Codec::encode(&ClientMessage::Input(input))?);
                }
                OpenEvent::Terminal(Some(TerminalEvent::Resize(size))) => {
                    try_send(&mut conn, Codec::encode(&ClientMessage::Resize(size))?);
                }
                OpenEvent::Terminal(None) => {
                    // Input source exhausted; server output keeps flowing.
                    debug!("terminal event stream ended");
                    terminal_done = true;
                }
                OpenEvent::Connection(Some(ConnectionEvent::Message(data))) => {
                    self.dispatch(&data);
                }
                OpenEvent::Connection(Some(ConnectionEvent::Opened)) => {
                    warn!("duplicate open event ignored");
                }
                OpenEvent::Connection(Some(ConnectionEvent::Closed))
                | OpenEvent::Connection(None) => {
                    return Ok(self.on_close());
                }
            }
        }
    }

    /// Dispatch one inbound message by kind byte.
    ///
    /// A malformed payload drops that message only; an unknown kind is
    /// ignored. Neither terminates the attempt.
    fn dispatch(&mut self, data: &str) {
        match Codec::decode(data) {
            Ok(ServerMessage::Output(bytes)) => {
                if let Err(e) = self.terminal.output(bytes) {
                    warn!(error = %e, "terminal output failed");
                }
            }
            Ok(ServerMessage::Pong) => trace!("keepalive pong"),
            Ok(ServerMessage::SetWindowTitle(title)) => {
                self.terminal.set_window_title(&title);
            }
            Ok(ServerMessage::SetPreferences(preferences)) => {
                self.terminal.set_preferences(&preferences);
            }
            Ok(ServerMessage::SetReconnect(seconds)) => {
                info!(seconds, "server assigned reconnect interval");
                self.policy.set_interval(seconds);
            }
            Err(Error::UnknownKind(kind)) => {
                trace!(kind, "ignoring unknown message kind");
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed message");
            }
        }
    }

    /// `OPEN -> CLOSED`: deactivate the terminal and surface the close.
    ///
    /// The keepalive timer is owned by the attempt scope and dies with it.
    fn on_close(&mut self) -> AttemptOutcome {
        info!("connection closed");
        self.terminal.deactivate();
        self.terminal.show_message(CLOSED_MESSAGE, None);
        AttemptOutcome::Closed
    }

    /// External termination: close the connection, never reconnect.
    fn teardown(&mut self, mut conn: F::Conn) -> AttemptOutcome {
        if conn.is_open() {
            conn.close();
        }
        AttemptOutcome::Cancelled
    }
}

/// Send a message, downgrading failures to a warning.
///
/// A failed send means the transport already broke; the close event is
/// on its way and the close path owns the recovery.
fn try_send<C: Connection>(conn: &mut C, data: String) {
    if let Err(e) = conn.send(data) {
        warn!(error = %e, "send failed");
    }
}

/// Close capability returned by [`Session::open`].
#[derive(Debug)]
pub struct SessionHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<Result<()>>,
}

impl SessionHandle {
    /// Terminate the session unconditionally: cancels any pending
    /// reconnect, closes the active connection, never restarts.
    /// Safe to call more than once.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// A cloneable close capability, detached from the handle.
    pub fn closer(&self) -> SessionCloser {
        SessionCloser {
            cancel: self.cancel.clone(),
        }
    }

    /// Whether [`SessionHandle::close`] has been invoked.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the controller task to finish and return its result.
    pub async fn wait(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| Error::Io(std::io::Error::other(format!("session task failed: {e}"))))?
    }
}

/// Detached close capability for a running session.
#[derive(Debug, Clone)]
pub struct SessionCloser {
    cancel: CancellationToken,
}

impl SessionCloser {
    /// Terminate the session. Safe to call more than once.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}
