//! WebSocket transport implementing the connection capability.
//!
//! `WsConnection` owns a pump task that performs the client handshake,
//! forwards outbound sends, and surfaces inbound frames as ordered
//! events. Per attempt, `Opened` and `Closed` are each emitted at most
//! once; every exit path (refused handshake, server close, transport
//! error, local close) funnels into the single `Closed` emission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ttylink_core::connection::{Connection, ConnectionEvent, ConnectionFactory};
use ttylink_core::constants::{ENDPOINT_PATH_SUFFIX, SUBPROTOCOL};
use ttylink_core::error::{Error, Result};

/// Build the endpoint URL the way the hosting origin dictates: secure
/// scheme iff the origin is secure, host verbatim, fixed suffix on the
/// base path.
pub fn endpoint_url(tls: bool, host: &str, base_path: &str) -> String {
    let scheme = if tls { "wss" } else { "ws" };
    let mut path = String::from(base_path);
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    if !path.ends_with('/') {
        path.push('/');
    }
    format!("{scheme}://{host}{path}{ENDPOINT_PATH_SUFFIX}")
}

/// Produces [`WsConnection`]s bound to a fixed endpoint and
/// sub-protocol list.
#[derive(Debug, Clone)]
pub struct WsConnectionFactory {
    url: String,
    protocols: Vec<String>,
}

impl WsConnectionFactory {
    /// Factory for the given endpoint URL with the default sub-protocol.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            protocols: vec![SUBPROTOCOL.to_string()],
        }
    }

    /// Override the sub-protocol list.
    pub fn with_protocols(mut self, protocols: Vec<String>) -> Self {
        self.protocols = protocols;
        self
    }

    /// The endpoint this factory binds connections to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ConnectionFactory for WsConnectionFactory {
    type Conn = WsConnection;

    fn create(&mut self) -> WsConnection {
        WsConnection::new(self.url.clone(), self.protocols.clone())
    }
}

/// One WebSocket connection attempt.
#[derive(Debug)]
pub struct WsConnection {
    url: String,
    protocols: Vec<String>,
    events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    outbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: Option<mpsc::UnboundedReceiver<String>>,
    alive: Arc<AtomicBool>,
    shutdown: CancellationToken,
    closed_delivered: bool,
}

impl WsConnection {
    fn new(url: String, protocols: Vec<String>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            url,
            protocols,
            events_rx,
            events_tx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            alive: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
            closed_delivered: false,
        }
    }

    fn client_request(&self) -> Result<Request> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Transport {
                message: format!("invalid endpoint url: {e}"),
            })?;
        if !self.protocols.is_empty() {
            let value =
                HeaderValue::from_str(&self.protocols.join(", ")).map_err(|e| Error::Transport {
                    message: format!("invalid sub-protocol list: {e}"),
                })?;
            request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }
        Ok(request)
    }
}

impl Connection for WsConnection {
    fn open(&mut self) -> Result<()> {
        let Some(outbound_rx) = self.outbound_rx.take() else {
            return Err(Error::Protocol {
                message: "connection already opened".into(),
            });
        };
        let request = self.client_request()?;

        self.alive.store(true, Ordering::SeqCst);
        tokio::spawn(pump(
            request,
            self.events_tx.clone(),
            outbound_rx,
            self.alive.clone(),
            self.shutdown.clone(),
        ));
        Ok(())
    }

    fn close(&mut self) {
        self.shutdown.cancel();
    }

    fn send(&mut self, data: String) -> Result<()> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        self.outbound_tx
            .send(data)
            .map_err(|_| Error::ConnectionClosed)
    }

    fn is_open(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn next_event(&mut self) -> Option<ConnectionEvent> {
        if self.closed_delivered {
            return None;
        }
        let event = match self.events_rx.recv().await {
            Some(event) => event,
            None => ConnectionEvent::Closed,
        };
        if event == ConnectionEvent::Closed {
            self.closed_delivered = true;
        }
        Some(event)
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Connection pump: handshake, then forward frames both ways until the
/// socket dies or the local end cancels. Emits `Closed` exactly once on
/// the way out.
async fn pump(
    request: Request,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    alive: Arc<AtomicBool>,
    shutdown: CancellationToken,
) {
    let connected = tokio::select! {
        _ = shutdown.cancelled() => None,
        result = connect_async(request) => match result {
            Ok((stream, response)) => {
                debug!(status = %response.status(), "websocket handshake complete");
                Some(stream)
            }
            Err(e) => {
                warn!(error = %e, "websocket connect failed");
                None
            }
        },
    };

    let Some(stream) = connected else {
        alive.store(false, Ordering::SeqCst);
        let _ = events.send(ConnectionEvent::Closed);
        return;
    };

    let _ = events.send(ConnectionEvent::Opened);
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                break;
            }
            data = outbound.recv() => match data {
                Some(text) => {
                    if let Err(e) = sink.send(WsMessage::Text(text)).await {
                        warn!(error = %e, "websocket send failed");
                        break;
                    }
                }
                None => break,
            },
            frame = source.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    let _ = events.send(ConnectionEvent::Message(text));
                }
                Some(Ok(WsMessage::Binary(bytes))) => {
                    // The protocol is text-framed; tolerate binary frames.
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    let _ = events.send(ConnectionEvent::Message(text));
                }
                Some(Ok(WsMessage::Close(_))) => {
                    debug!("websocket closed by server");
                    break;
                }
                // Ping/pong and raw frames are handled by the protocol layer.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "websocket receive failed");
                    break;
                }
                None => break,
            },
        }
    }

    alive.store(false, Ordering::SeqCst);
    let _ = events.send(ConnectionEvent::Closed);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_mirrors_origin_scheme() {
        assert_eq!(endpoint_url(false, "host:8080", "/"), "ws://host:8080/ws");
        assert_eq!(endpoint_url(true, "host", "/"), "wss://host/ws");
    }

    #[test]
    fn endpoint_url_normalizes_base_path() {
        assert_eq!(
            endpoint_url(false, "host", "/console"),
            "ws://host/console/ws"
        );
        assert_eq!(
            endpoint_url(false, "host", "console/"),
            "ws://host/console/ws"
        );
    }

    #[test]
    fn factory_advertises_the_fixed_subprotocol() {
        let mut factory = WsConnectionFactory::new("ws://host/ws");
        let conn = factory.create();
        let request = conn.client_request().unwrap();
        assert_eq!(
            request.headers().get(SEC_WEBSOCKET_PROTOCOL).unwrap(),
            SUBPROTOCOL
        );
    }

    #[tokio::test]
    async fn double_open_is_rejected() {
        let mut factory = WsConnectionFactory::new("ws://127.0.0.1:1/ws");
        let mut conn = factory.create();
        conn.open().unwrap();
        assert!(conn.open().is_err());
        conn.close();
    }

    #[tokio::test]
    async fn refused_connect_reads_as_close() {
        // Nothing listens on the discard port of the loopback here; the
        // connect fails and the attempt surfaces a single close event.
        let mut factory = WsConnectionFactory::new("ws://127.0.0.1:1/ws");
        let mut conn = factory.create();
        conn.open().unwrap();

        assert_eq!(conn.next_event().await, Some(ConnectionEvent::Closed));
        assert_eq!(conn.next_event().await, None);
        assert!(!conn.is_open());
    }

    #[test]
    fn send_before_open_fails() {
        let mut factory = WsConnectionFactory::new("ws://host/ws");
        let mut conn = factory.create();
        assert!(matches!(
            conn.send("1x".into()),
            Err(Error::ConnectionClosed)
        ));
    }
}
