//! Duplex transport abstraction
//!
//! The feed session talks to the exchange through the [`Transport`] trait so
//! that reconnection and protocol handling can be exercised against
//! [`MockTransport`] without touching the network.
//!
//! # Example
//!
//! ```no_run
//! use depth_feed::transport::{Transport, TransportError, WsTransport};
//!
//! async fn example() -> Result<(), TransportError> {
//!     let mut transport = WsTransport::new("wss://ws.kraken.com/v2");
//!     transport.connect().await?;
//!     if let Some(frame) = transport.recv().await? {
//!         println!("first frame: {frame}");
//!     }
//!     transport.close().await
//! }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument, trace};

/// Default time allowed for the WebSocket handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport layer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Handshake failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Peer went away without a close frame
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Handshake did not finish in time
    #[error("connection timeout after {0:?}")]
    Timeout(Duration),

    /// Operation needs an open connection
    #[error("not connected")]
    NotConnected,

    /// Frame could not be decoded as text
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// One duplex text connection to one endpoint
///
/// `connect` may be called again after a failure or a close; implementations
/// drop any previous stream first.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Send a text frame
    async fn send(&mut self, message: &str) -> Result<(), TransportError>;

    /// Receive the next text frame
    ///
    /// Returns `None` when the peer closed the connection gracefully.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if currently connected
    fn is_connected(&self) -> bool;

    /// Endpoint URL
    fn endpoint(&self) -> &str;
}

/// WebSocket transport backed by tokio-tungstenite
pub struct WsTransport {
    url: String,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    connect_timeout: Duration,
}

impl WsTransport {
    /// Create an unconnected transport for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the handshake timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl Transport for WsTransport {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.stream = None;
        debug!("Opening WebSocket");

        let (stream, _response) = timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        self.stream = Some(stream);
        debug!("WebSocket open");
        Ok(())
    }

    #[instrument(skip(self, message), fields(len = message.len()))]
    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream
            .send(Message::Text(message.to_string()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(data))) => {
                    return String::from_utf8(data)
                        .map(Some)
                        .map_err(|e| TransportError::Protocol(e.to_string()));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Peer sent close frame");
                    self.stream = None;
                    return Ok(None);
                }
                // tungstenite answers pings itself on the next write
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    trace!("Skipping control frame");
                }
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    self.stream = None;
                    return Err(TransportError::ConnectionClosed);
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .close(None)
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockController, MockTransport};

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::{Transport, TransportError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    type Frame = Result<Option<String>, TransportError>;

    #[derive(Debug, Default)]
    struct Shared {
        sent: Vec<String>,
        connects: u32,
        closes: u32,
        fail_connects: u32,
        fail_send: bool,
    }

    /// Scripted transport for tests
    ///
    /// Frames are fed through the paired [`MockController`], which stays usable
    /// after the transport has been moved into a session task. While the
    /// controller is alive and no frame is queued, `recv` waits like an idle
    /// socket; once every controller is dropped, `recv` reports a closed
    /// connection.
    pub struct MockTransport {
        url: String,
        connected: bool,
        inbound: mpsc::UnboundedReceiver<Frame>,
        shared: Arc<Mutex<Shared>>,
    }

    /// Test-side handle of a [`MockTransport`]
    #[derive(Clone)]
    pub struct MockController {
        inbound: mpsc::UnboundedSender<Frame>,
        shared: Arc<Mutex<Shared>>,
    }

    impl MockTransport {
        /// Create a mock transport and its controller
        pub fn new(url: impl Into<String>) -> (Self, MockController) {
            let (tx, rx) = mpsc::unbounded_channel();
            let shared = Arc::new(Mutex::new(Shared::default()));
            let transport = Self {
                url: url.into(),
                connected: false,
                inbound: rx,
                shared: Arc::clone(&shared),
            };
            (transport, MockController { inbound: tx, shared })
        }
    }

    impl MockController {
        /// Queue a text frame
        pub fn push_text(&self, frame: impl Into<String>) {
            let _ = self.inbound.send(Ok(Some(frame.into())));
        }

        /// Queue a graceful close from the peer
        pub fn push_close(&self) {
            let _ = self.inbound.send(Ok(None));
        }

        /// Queue a receive error
        pub fn push_error(&self, error: TransportError) {
            let _ = self.inbound.send(Err(error));
        }

        /// Make the next `n` connect attempts fail
        pub fn fail_next_connects(&self, n: u32) {
            self.shared.lock().fail_connects = n;
        }

        /// Make every send fail (or succeed again)
        pub fn set_fail_send(&self, fail: bool) {
            self.shared.lock().fail_send = fail;
        }

        /// Frames sent so far
        pub fn sent(&self) -> Vec<String> {
            self.shared.lock().sent.clone()
        }

        /// Number of connect calls, failed ones included
        pub fn connect_count(&self) -> u32 {
            self.shared.lock().connects
        }

        /// Number of close calls
        pub fn close_count(&self) -> u32 {
            self.shared.lock().closes
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn connect(&mut self) -> Result<(), TransportError> {
            let mut shared = self.shared.lock();
            shared.connects += 1;
            if shared.fail_connects > 0 {
                shared.fail_connects -= 1;
                self.connected = false;
                return Err(TransportError::ConnectionFailed("mock connection failure".into()));
            }
            self.connected = true;
            Ok(())
        }

        async fn send(&mut self, message: &str) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::NotConnected);
            }
            let mut shared = self.shared.lock();
            if shared.fail_send {
                return Err(TransportError::SendFailed("mock send failure".into()));
            }
            shared.sent.push(message.to_string());
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<String>, TransportError> {
            if !self.connected {
                return Err(TransportError::NotConnected);
            }
            let frame = self
                .inbound
                .recv()
                .await
                .unwrap_or(Err(TransportError::ConnectionClosed));
            if !matches!(frame, Ok(Some(_))) {
                self.connected = false;
            }
            frame
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.shared.lock().closes += 1;
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn endpoint(&self) -> &str {
            &self.url
        }
    }
}
