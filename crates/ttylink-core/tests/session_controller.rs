//! Integration tests for the session controller.
//!
//! Drives the controller through mock capability implementations and
//! checks the observable protocol properties: handshake-first ordering,
//! keepalive cadence, inbound dispatch, reconnect scheduling, and close
//! idempotence. Timing-sensitive tests run under paused tokio time.

use std::time::Duration;

use tokio::time::Instant;

use ttylink_core::{Session, SessionHandle};
use ttylink_test_utils::{mock_factory, mock_terminal, MockFactoryHandle, MockTerminalHandle};

const KEEPALIVE: Duration = Duration::from_secs(30);

/// Spawn a session over fresh mocks with an 80x24 terminal.
fn start_session(
    arguments: &str,
    auth_token: &str,
) -> (SessionHandle, MockFactoryHandle, MockTerminalHandle) {
    let (terminal, term_handle) = mock_terminal(80, 24);
    let (factory, factory_handle) = mock_factory();
    let session = Session::new(terminal, factory, arguments, auth_token);
    (session.open(), factory_handle, term_handle)
}

/// Let the controller task drain its pending events without advancing time.
async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test(start_paused = true)]
async fn handshake_precedes_input_and_resize() {
    let (session, mut factory, term) = start_session("?cols=80", "tok-1");

    // Input queued before the connection even opens must not overtake
    // the handshake.
    term.input("early");

    let mut remote = factory.next_remote().await.unwrap();
    remote.accept();

    assert_eq!(
        remote.recv().await.unwrap(),
        r#"{"Arguments":"?cols=80","AuthToken":"tok-1"}"#
    );
    assert_eq!(remote.recv().await.unwrap(), r#"3{"columns":80,"rows":24}"#);
    assert_eq!(remote.recv().await.unwrap(), "1early");

    session.close();
}

#[tokio::test(start_paused = true)]
async fn resize_events_are_forwarded() {
    let (session, mut factory, term) = start_session("", "t");
    let mut remote = factory.next_remote().await.unwrap();
    remote.accept();

    // Skip handshake and initial resize.
    remote.recv().await.unwrap();
    remote.recv().await.unwrap();

    term.resize(132, 43);
    assert_eq!(remote.recv().await.unwrap(), r#"3{"columns":132,"rows":43}"#);

    session.close();
}

// =============================================================================
// Keepalive
// =============================================================================

#[tokio::test(start_paused = true)]
async fn keepalive_pings_on_a_30s_period() {
    let (session, mut factory, _term) = start_session("", "t");
    let mut remote = factory.next_remote().await.unwrap();
    remote.accept();

    remote.recv().await.unwrap();
    remote.recv().await.unwrap();

    let opened_at = Instant::now();
    assert_eq!(remote.recv().await.unwrap(), "2");
    let first_ping = Instant::now() - opened_at;
    assert!(first_ping >= KEEPALIVE, "first ping after {first_ping:?}");
    assert!(first_ping < KEEPALIVE + Duration::from_secs(1));

    let t1 = Instant::now();
    assert_eq!(remote.recv().await.unwrap(), "2");
    assert!(Instant::now() - t1 >= KEEPALIVE);

    session.close();
}

// =============================================================================
// Inbound dispatch
// =============================================================================

#[tokio::test(start_paused = true)]
async fn output_payload_is_base64_decoded() {
    let (session, mut factory, term) = start_session("", "t");
    let remote = factory.next_remote().await.unwrap();
    remote.accept();

    // "aGk=" is base64 of "hi"
    remote.send("1aGk=");
    settle().await;

    assert_eq!(term.output_bytes(), b"hi");
    session.close();
}

#[tokio::test(start_paused = true)]
async fn control_messages_reach_the_terminal() {
    let (session, mut factory, term) = start_session("", "t");
    let remote = factory.next_remote().await.unwrap();
    remote.accept();

    remote.send("3remote: /var/log");
    remote.send(r#"4{"font-size":14}"#);
    remote.send("2"); // pong: discarded
    settle().await;

    assert_eq!(term.titles(), vec!["remote: /var/log".to_string()]);
    term.with_record(|r| {
        assert_eq!(r.preferences.len(), 1);
        assert_eq!(r.preferences[0]["font-size"], 14);
        assert!(r.outputs.is_empty());
    });

    session.close();
}

#[tokio::test(start_paused = true)]
async fn unknown_kind_is_ignored_and_session_survives() {
    let (session, mut factory, term) = start_session("", "t");
    let mut remote = factory.next_remote().await.unwrap();
    remote.accept();

    remote.recv().await.unwrap();
    remote.recv().await.unwrap();

    remote.send("9unassigned");
    remote.send("1aGk=");
    settle().await;

    // The unassigned kind touched nothing; the following message was
    // still processed and the connection is still usable.
    assert_eq!(term.output_bytes(), b"hi");
    term.input("k");
    assert_eq!(remote.recv().await.unwrap(), "1k");

    session.close();
}

#[tokio::test(start_paused = true)]
async fn malformed_control_payload_drops_that_message_only() {
    let (session, mut factory, term) = start_session("", "t");
    let remote = factory.next_remote().await.unwrap();
    remote.accept();

    remote.send("4{not json");
    remote.send("5soon");
    remote.send("1aGk=");
    settle().await;

    term.with_record(|r| assert!(r.preferences.is_empty()));
    assert_eq!(term.output_bytes(), b"hi");

    session.close();
}

// =============================================================================
// Close and reconnect policy
// =============================================================================

#[tokio::test(start_paused = true)]
async fn close_without_reconnect_is_permanent() {
    let (session, mut factory, term) = start_session("", "t");
    let remote = factory.next_remote().await.unwrap();
    remote.accept();
    settle().await;

    remote.close();
    session.wait().await.unwrap();

    assert_eq!(factory.created(), 1);
    assert_eq!(term.deactivations(), 1);
    assert_eq!(
        term.messages(),
        vec![("Connection Closed".to_string(), None)]
    );
}

#[tokio::test(start_paused = true)]
async fn reconnect_disabled_sentinel_prevents_new_attempt() {
    let (session, mut factory, _term) = start_session("", "t");
    let remote = factory.next_remote().await.unwrap();
    remote.accept();

    remote.send("5-1");
    settle().await;
    remote.close();

    session.wait().await.unwrap();
    assert_eq!(factory.created(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnect_after_assigned_interval_with_identical_handshake() {
    let (session, mut factory, term) = start_session("?session=9", "tok-9");
    let mut remote = factory.next_remote().await.unwrap();
    remote.accept();

    let handshake = remote.recv().await.unwrap();
    remote.recv().await.unwrap();

    remote.send("530");
    settle().await;

    let closed_at = Instant::now();
    remote.close();
    settle().await;

    // The close surfaced, and no second attempt exists yet.
    assert_eq!(term.deactivations(), 1);
    assert_eq!(factory.created(), 1);
    assert!(factory.try_next_remote().is_none());

    // The new attempt arrives no earlier than the assigned 30 seconds,
    // with the terminal reset and a handshake identical in shape.
    let mut second = factory.next_remote().await.unwrap();
    assert!(Instant::now() - closed_at >= Duration::from_secs(30));
    assert_eq!(factory.created(), 2);
    assert_eq!(term.resets(), 1);

    second.accept();
    assert_eq!(second.recv().await.unwrap(), handshake);
    assert_eq!(second.recv().await.unwrap(), r#"3{"columns":80,"rows":24}"#);

    session.close();
}

#[tokio::test(start_paused = true)]
async fn reconnect_interval_persists_across_attempts() {
    let (session, mut factory, _term) = start_session("", "t");
    let remote = factory.next_remote().await.unwrap();
    remote.accept();
    remote.send("51");
    settle().await;
    remote.close();

    // First reconnect after 1s; the second attempt never reassigns the
    // interval, so a later close schedules another attempt too.
    let second = factory.next_remote().await.unwrap();
    second.accept();
    settle().await;
    second.close();

    let third = factory.next_remote().await.unwrap();
    assert_eq!(factory.created(), 3);

    drop(third);
    session.close();
}

#[tokio::test(start_paused = true)]
async fn failed_connect_takes_the_same_close_path() {
    let (session, mut factory, term) = start_session("", "t");
    let remote = factory.next_remote().await.unwrap();

    // Server refuses: close before any open event.
    remote.close();
    session.wait().await.unwrap();

    assert_eq!(term.deactivations(), 1);
    assert_eq!(
        term.messages(),
        vec![("Connection Closed".to_string(), None)]
    );
}

// =============================================================================
// Close capability
// =============================================================================

#[tokio::test(start_paused = true)]
async fn close_is_idempotent() {
    let (session, mut factory, term) = start_session("", "t");
    let remote = factory.next_remote().await.unwrap();
    remote.accept();
    settle().await;

    session.close();
    session.close();
    assert!(session.is_closed());
    session.wait().await.unwrap();

    assert!(remote.closed_by_client());
    assert_eq!(factory.created(), 1);
    // Local close is not a remote close: no overlay, no deactivation.
    assert_eq!(term.deactivations(), 0);
}

#[tokio::test(start_paused = true)]
async fn close_cancels_a_pending_reconnect() {
    let (session, mut factory, _term) = start_session("", "t");
    let remote = factory.next_remote().await.unwrap();
    remote.accept();

    remote.send("530");
    settle().await;
    remote.close();
    settle().await;

    // The reconnect sleep is pending; closing must cancel it without
    // letting the timer create a second connection.
    let before = Instant::now();
    session.close();
    session.wait().await.unwrap();

    assert_eq!(factory.created(), 1);
    assert!(Instant::now() - before < Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn close_during_connecting_closes_the_connection() {
    let (session, mut factory, _term) = start_session("", "t");
    let remote = factory.next_remote().await.unwrap();

    // No accept: the attempt is still CONNECTING.
    settle().await;
    session.close();
    session.wait().await.unwrap();

    assert!(remote.closed_by_client());
    assert_eq!(factory.created(), 1);
}
