//! Kraken WebSocket v2 book feed
//!
//! This crate owns everything between the socket and the book: the
//! [`Transport`] abstraction, the constant-delay [`ReconnectPolicy`], the
//! bounded [`OutboundBuffer`], protocol decoding for the `book` channel and
//! the [`FeedSession`] task that ties them together.
//!
//! # Features
//!
//! - Subscribe on every (re)open, best-effort unsubscribe on close
//! - Book entries for other symbols and malformed levels are dropped
//! - Attempt-bounded reconnection
//! - `test-utils` exposes [`MockTransport`] for driving sessions in tests
//!
//! # Example
//!
//! ```no_run
//! use depth_feed::{Endpoint, FeedEvent, FeedSession, ReconnectPolicy, Subscription, WsTransport};
//! use depth_types::{Depth, Symbol};
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = WsTransport::new(Endpoint::Public.url());
//!     let subscription = Subscription::new(Symbol::default(), Depth::D10);
//!     let (handle, mut events) =
//!         FeedSession::spawn(Box::new(transport), subscription, ReconnectPolicy::default());
//!
//!     while let Some(event) = events.recv().await {
//!         if let FeedEvent::Signal(signal) = event {
//!             println!("{} levels", signal.data().bids.len());
//!             handle.close();
//!         }
//!     }
//! }
//! ```

pub mod endpoint;
pub mod events;
pub mod outbound;
pub mod protocol;
pub mod reconnect;
pub mod session;
pub mod subscription;
pub mod transport;

// Re-export main types
pub use endpoint::Endpoint;
pub use events::{BookSignal, DisconnectReason, FeedEvent};
pub use outbound::{OutboundBuffer, OUTBOUND_CAPACITY};
pub use protocol::{decode, Decoded};
pub use reconnect::ReconnectPolicy;
pub use session::{FeedHandle, FeedSession};
pub use subscription::Subscription;
pub use transport::{Transport, TransportError, WsTransport};

#[cfg(any(test, feature = "test-utils"))]
pub use transport::{MockController, MockTransport};
