//! Feed session task
//!
//! A session owns one transport and one subscription. It runs on its own
//! tokio task: open, subscribe, read frames, retry per the
//! [`ReconnectPolicy`], and report everything as [`FeedEvent`]s. The owner
//! drives it through a [`FeedHandle`].

use crate::events::{DisconnectReason, FeedEvent};
use crate::outbound::{OutboundBuffer, OUTBOUND_CAPACITY};
use crate::protocol::{self, Decoded};
use crate::reconnect::ReconnectPolicy;
use crate::subscription::Subscription;
use crate::transport::{Transport, TransportError};
use depth_types::DepthError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Commands accepted by a running session
#[derive(Debug)]
enum Command {
    Send(String),
    Close,
}

/// How a connected read loop ended
enum Exit {
    Lost(DisconnectReason),
    Closed,
}

/// Owner-side handle of a running session
///
/// Dropping the handle closes the command channel, which the session treats
/// as a close request.
#[derive(Debug)]
pub struct FeedHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Send a raw frame, buffering it while the connection is down
    ///
    /// Returns `false` if the session has already ended.
    pub fn send(&self, frame: impl Into<String>) -> bool {
        self.commands.send(Command::Send(frame.into())).is_ok()
    }

    /// Ask the session to unsubscribe, close the transport and end
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Stop the session task without the closing handshake
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Check if the session task has ended
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Session state, moved into the spawned task
pub struct FeedSession {
    transport: Box<dyn Transport>,
    link: Link,
}

/// Everything except the transport, so the two can be borrowed separately
struct Link {
    subscription: Subscription,
    policy: ReconnectPolicy,
    outbound: OutboundBuffer,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<FeedEvent>,
    next_req_id: u64,
}

impl FeedSession {
    /// Spawn a session on the current tokio runtime
    ///
    /// Events arrive on the returned receiver in wire order. The receiver
    /// closes once the session ends.
    pub fn spawn(
        transport: Box<dyn Transport>,
        subscription: Subscription,
        policy: ReconnectPolicy,
    ) -> (FeedHandle, mpsc::UnboundedReceiver<FeedEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let session = Self {
            transport,
            link: Link {
                subscription,
                policy,
                outbound: OutboundBuffer::new(OUTBOUND_CAPACITY),
                commands: command_rx,
                events: event_tx,
                next_req_id: 1,
            },
        };
        let task = tokio::spawn(session.run());

        (
            FeedHandle {
                commands: command_tx,
                task,
            },
            event_rx,
        )
    }

    #[instrument(skip(self), fields(url = %self.transport.endpoint(), symbol = %self.link.subscription.symbol))]
    async fn run(mut self) {
        let url = self.transport.endpoint().to_string();
        let mut attempt: u32 = 0;
        self.link.emit(FeedEvent::Connecting);

        loop {
            info!("Connecting to {}", url);
            let opened = {
                let connect = self.transport.connect();
                tokio::pin!(connect);
                loop {
                    tokio::select! {
                        result = &mut connect => break result,
                        command = self.link.commands.recv() => match command {
                            Some(Command::Send(frame)) => self.link.buffer(frame),
                            Some(Command::Close) | None => {
                                info!("Close requested while connecting");
                                self.link.emit(FeedEvent::Closed);
                                return;
                            }
                        },
                    }
                }
            };

            match opened {
                Ok(()) => {
                    attempt = 0;
                    match self.serve().await {
                        Exit::Closed => return,
                        Exit::Lost(reason) => {
                            warn!(?reason, "Connection lost");
                            let failure = match &reason {
                                DisconnectReason::NetworkError(cause)
                                | DisconnectReason::SendFailed(cause) => {
                                    Some(DepthError::connection(&url, cause.as_str()))
                                }
                                DisconnectReason::ServerClosed | DisconnectReason::Shutdown => None,
                            };
                            self.link.emit(FeedEvent::Disconnected { reason });
                            if let Some(error) = failure {
                                self.link.emit(FeedEvent::Error(error));
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Connection to {} failed: {}", url, e);
                    self.link.emit(FeedEvent::Error(connect_error(&url, e)));
                }
            }

            attempt += 1;
            if !self.link.policy.should_reconnect(attempt) {
                let attempts = attempt - 1;
                error!("Reconnection attempts exhausted after {} tries", attempts);
                let _ = self.transport.close().await;
                self.link.emit(FeedEvent::Failed(DepthError::ReconnectExhausted {
                    url,
                    attempts,
                }));
                return;
            }

            let delay = self.link.policy.delay_for_attempt(attempt);
            info!("Reconnecting in {:?} (attempt {})", delay, attempt);
            self.link.emit(FeedEvent::Reconnecting { attempt, delay });

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    command = self.link.commands.recv() => match command {
                        Some(Command::Send(frame)) => self.link.buffer(frame),
                        Some(Command::Close) | None => {
                            info!("Close requested while waiting to reconnect");
                            self.link.emit(FeedEvent::Closed);
                            return;
                        }
                    },
                }
            }
        }
    }

    /// Subscribe, flush, then read until the connection ends
    async fn serve(&mut self) -> Exit {
        let req_id = self.link.req_id();
        let subscribe = self.link.subscription.subscribe_request(req_id);
        match subscribe.to_json() {
            Ok(frame) => {
                debug!("Sending subscription: {}", frame);
                if let Err(e) = self.transport.send(&frame).await {
                    return Exit::Lost(DisconnectReason::SendFailed(e.to_string()));
                }
            }
            Err(e) => {
                self.link.emit(FeedEvent::Error(DepthError::subscription(e.to_string())));
            }
        }

        info!("Connected");
        self.link.emit(FeedEvent::Opened);

        while let Some(frame) = self.link.outbound.pop() {
            if let Err(e) = self.transport.send(&frame).await {
                self.link.outbound.requeue(frame);
                return Exit::Lost(DisconnectReason::SendFailed(e.to_string()));
            }
        }

        loop {
            tokio::select! {
                frame = self.transport.recv() => match frame {
                    Ok(Some(text)) => self.link.handle_frame(&text),
                    Ok(None) => {
                        info!("Server closed connection");
                        return Exit::Lost(DisconnectReason::ServerClosed);
                    }
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        return Exit::Lost(DisconnectReason::NetworkError(e.to_string()));
                    }
                },
                command = self.link.commands.recv() => match command {
                    Some(Command::Send(frame)) => {
                        if let Err(e) = self.transport.send(&frame).await {
                            self.link.buffer(frame);
                            return Exit::Lost(DisconnectReason::SendFailed(e.to_string()));
                        }
                    }
                    Some(Command::Close) | None => {
                        self.shutdown().await;
                        return Exit::Closed;
                    }
                },
            }
        }
    }

    /// Best-effort unsubscribe and close
    async fn shutdown(&mut self) {
        info!("Shutdown requested, closing connection");
        let req_id = self.link.req_id();
        let unsubscribe = self.link.subscription.unsubscribe_request(req_id);
        match unsubscribe.to_json() {
            Ok(frame) => {
                if let Err(e) = self.transport.send(&frame).await {
                    warn!("Failed to send unsubscribe: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode unsubscribe: {}", e),
        }
        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport: {}", e);
        }
        self.link.emit(FeedEvent::Disconnected {
            reason: DisconnectReason::Shutdown,
        });
        self.link.emit(FeedEvent::Closed);
    }
}

impl Link {
    fn emit(&self, event: FeedEvent) {
        let _ = self.events.send(event);
    }

    fn req_id(&mut self) -> u64 {
        let id = self.next_req_id;
        self.next_req_id += 1;
        id
    }

    fn buffer(&mut self, frame: String) {
        if let Some(dropped) = self.outbound.push(frame) {
            warn!(len = dropped.len(), "Outbound buffer full, dropped oldest frame");
        }
    }

    fn handle_frame(&mut self, text: &str) {
        match protocol::decode(text, &self.subscription) {
            Ok(Decoded::Book(signals)) => {
                for signal in signals {
                    self.emit(FeedEvent::Signal(signal));
                }
            }
            Ok(Decoded::Status(status)) => {
                info!(%status, "Exchange status");
                self.emit(FeedEvent::SystemStatus(status));
            }
            Ok(Decoded::Subscribed { symbol, depth }) => {
                info!(?symbol, ?depth, "Subscribed");
                self.emit(FeedEvent::Subscribed { symbol, depth });
            }
            Ok(Decoded::Rejected(error)) => {
                error!("Subscription rejected: {}", error);
                self.emit(FeedEvent::Error(error));
            }
            Ok(Decoded::Ignored) => {}
            Err(error) => {
                warn!("Failed to parse message: {}", error);
                self.emit(FeedEvent::Error(error));
            }
        }
    }
}

fn connect_error(url: &str, error: TransportError) -> DepthError {
    match error {
        TransportError::Timeout(timeout) => DepthError::ConnectionTimeout {
            url: url.to_string(),
            timeout,
        },
        other => DepthError::connection(url, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use depth_types::{Depth, Symbol};
    use std::time::Duration;

    fn subscription() -> Subscription {
        Subscription::new(Symbol::default(), Depth::D10)
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_subscribe_and_close() {
        let (transport, controller) = MockTransport::new("wss://mock.test");
        let (handle, mut events) =
            FeedSession::spawn(Box::new(transport), subscription(), ReconnectPolicy::default());

        assert!(matches!(events.recv().await, Some(FeedEvent::Connecting)));
        assert!(matches!(events.recv().await, Some(FeedEvent::Opened)));

        let sent = controller.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains(r#""method":"subscribe""#));

        handle.close();
        assert!(matches!(
            events.recv().await,
            Some(FeedEvent::Disconnected {
                reason: DisconnectReason::Shutdown
            })
        ));
        assert!(matches!(events.recv().await, Some(FeedEvent::Closed)));
        assert!(events.recv().await.is_none());

        let sent = controller.sent();
        assert!(sent[1].contains(r#""method":"unsubscribe""#));
        assert_eq!(controller.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let (transport, controller) = MockTransport::new("wss://mock.test");
        controller.fail_next_connects(10);
        let policy = ReconnectPolicy::new()
            .with_max_attempts(2)
            .with_delay(Duration::from_millis(50));
        let (_handle, mut events) = FeedSession::spawn(Box::new(transport), subscription(), policy);

        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            seen.push(event);
        }

        let reconnects = seen
            .iter()
            .filter(|e| matches!(e, FeedEvent::Reconnecting { .. }))
            .count();
        assert_eq!(reconnects, 2);
        assert_eq!(controller.connect_count(), 3);
        assert!(matches!(
            seen.last(),
            Some(FeedEvent::Failed(DepthError::ReconnectExhausted { attempts: 2, .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_policy_never_retries() {
        let (transport, controller) = MockTransport::new("wss://mock.test");
        controller.fail_next_connects(1);
        let (_handle, mut events) =
            FeedSession::spawn(Box::new(transport), subscription(), ReconnectPolicy::disabled());

        assert!(matches!(events.recv().await, Some(FeedEvent::Connecting)));
        assert!(matches!(events.recv().await, Some(FeedEvent::Error(DepthError::Connection { .. }))));
        assert!(matches!(
            events.recv().await,
            Some(FeedEvent::Failed(DepthError::ReconnectExhausted { attempts: 0, .. }))
        ));
        assert_eq!(controller.connect_count(), 1);
    }
}
