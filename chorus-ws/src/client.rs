//! Websocket client with reconnect, heartbeat, and teardown
//!
//! [`WsClient::new`] returns a client/handle pair. The client is consumed by
//! [`WsClient::start`], which runs the connect loop until the handle is
//! closed; the [`WsHandle`] is the cheap, cloneable sending side given to
//! the command layer.
//!
//! Each connection attempt opens a brand-new socket; there are no resume
//! semantics. The previous socket and its heartbeat timer are torn down
//! before a replacement is opened, so stale listeners can never deliver
//! duplicate events.

use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{WsError, WsSendError};
use crate::models::{InboundMessage, OutboundMessage};

/// Configuration for the transport client
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Minimum spacing between the starts of consecutive connection
    /// attempts. Default: 5000 ms
    pub reconnect_debounce: Duration,

    /// Heartbeat ping interval, active only while a socket is open.
    /// Default: 9 minutes
    pub heartbeat_interval: Duration,

    /// Give up after this many consecutive failed attempts.
    /// Default: `None` (retry forever)
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            reconnect_debounce: Duration::from_millis(5000),
            heartbeat_interval: Duration::from_secs(9 * 60),
            max_reconnect_attempts: None,
        }
    }
}

impl WsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reconnect_debounce(mut self, debounce: Duration) -> Self {
        self.reconnect_debounce = debounce;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), WsError> {
        if self.reconnect_debounce == Duration::ZERO {
            return Err(WsError::Configuration(
                "Reconnect debounce must be greater than 0".to_string(),
            ));
        }
        if self.heartbeat_interval == Duration::ZERO {
            return Err(WsError::Configuration(
                "Heartbeat interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Debounce bookkeeping for reconnect attempts
///
/// A reconnect is delayed only when the previous attempt *started* less
/// than the debounce window ago; the delay covers exactly the remaining
/// window. An attempt that ran longer than the window reconnects
/// immediately.
#[derive(Debug)]
pub struct ReconnectTimer {
    debounce: Duration,
    last_attempt: Option<Instant>,
}

impl ReconnectTimer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            last_attempt: None,
        }
    }

    /// Record that a connection attempt is starting now
    pub fn mark_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }

    /// How long to wait before the next attempt, if at all
    pub fn next_delay(&self, now: Instant) -> Option<Duration> {
        let last = self.last_attempt?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.debounce {
            Some(self.debounce - elapsed)
        } else {
            None
        }
    }
}

/// Sending side of the transport
///
/// Frames sent while the socket is between reconnect attempts are queued
/// internally and flushed once a socket opens.
#[derive(Debug, Clone)]
pub struct WsHandle {
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    cancel: CancellationToken,
}

impl WsHandle {
    /// Queue an outbound frame for delivery
    pub fn send(&self, message: OutboundMessage) -> Result<(), WsSendError> {
        self.out_tx.send(message).map_err(|_| WsSendError)
    }

    /// Tear the connection down permanently
    ///
    /// The connect loop exits; no further reconnect attempts are made.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// The connection-owning side of the transport
///
/// Consumed by [`start`](Self::start), which should be spawned onto the
/// runtime by the caller.
pub struct WsClient {
    url: Url,
    config: WsConfig,
    out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    cancel: CancellationToken,
}

impl WsClient {
    /// Create a client/handle pair for the given `ws://` or `wss://` URL
    pub fn new(url: &str, config: WsConfig) -> Result<(Self, WsHandle), WsError> {
        config.validate()?;
        let url = Url::parse(url)?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => return Err(WsError::UnsupportedScheme(other.to_string())),
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let client = Self {
            url,
            config,
            out_rx,
            cancel: cancel.clone(),
        };
        let handle = WsHandle { out_tx, cancel };

        Ok((client, handle))
    }

    /// Run the connect loop until closed
    ///
    /// Inbound frames are forwarded over `inbound_tx` strictly in receipt
    /// order. `on_open` fires after every successful open (including
    /// reconnects) so the caller can resynchronize state that drifted while
    /// disconnected. Connection errors are logged and retried, never
    /// returned.
    pub async fn start<F>(mut self, inbound_tx: mpsc::UnboundedSender<InboundMessage>, on_open: F)
    where
        F: Fn() + Send + 'static,
    {
        let mut timer = ReconnectTimer::new(self.config.reconnect_debounce);
        let mut consecutive_failures: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            if let Some(delay) = timer.next_delay(Instant::now()) {
                tracing::debug!(?delay, "debouncing reconnect");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.cancel.cancelled() => break,
                }
            }

            timer.mark_attempt(Instant::now());
            tracing::debug!(url = %self.url, "connecting");

            let stream = tokio::select! {
                result = tokio_tungstenite::connect_async(self.url.as_str()) => match result {
                    Ok((stream, _response)) => stream,
                    Err(e) => {
                        tracing::warn!("failed to open socket: {e}");
                        consecutive_failures += 1;
                        if self.attempts_exhausted(consecutive_failures) {
                            break;
                        }
                        continue;
                    }
                },
                _ = self.cancel.cancelled() => break,
            };

            tracing::debug!("socket open");
            consecutive_failures = 0;
            on_open();

            let (mut sink, mut source) = stream.split();

            // Heartbeat starts one interval after open, never immediately
            let mut heartbeat = tokio::time::interval_at(
                tokio::time::Instant::now() + self.config.heartbeat_interval,
                self.config.heartbeat_interval,
            );

            let closed = loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        let _ = sink.send(Message::Close(None)).await;
                        return;
                    }
                    _ = heartbeat.tick() => {
                        tracing::trace!("sending heartbeat ping");
                        let frame = serde_json::to_string(&OutboundMessage::Ping)
                            .expect("frame serialization is infallible");
                        if let Err(e) = sink.send(Message::Text(frame)).await {
                            tracing::warn!("heartbeat send failed: {e}");
                            break true;
                        }
                    }
                    maybe_out = self.out_rx.recv() => match maybe_out {
                        Some(message) => {
                            let frame = serde_json::to_string(&message)
                                .expect("frame serialization is infallible");
                            tracing::trace!(%frame, "sending frame");
                            if let Err(e) = sink.send(Message::Text(frame)).await {
                                tracing::warn!("send failed: {e}");
                                break true;
                            }
                        }
                        None => {
                            tracing::debug!("all handles dropped, closing");
                            let _ = sink.send(Message::Close(None)).await;
                            return;
                        }
                    },
                    maybe_in = source.next() => match maybe_in {
                        Some(Ok(Message::Text(text))) => {
                            if !forward_frame(&inbound_tx, &text) {
                                return;
                            }
                        }
                        Some(Ok(Message::Binary(bytes))) => {
                            match String::from_utf8(bytes) {
                                Ok(text) => {
                                    if !forward_frame(&inbound_tx, &text) {
                                        return;
                                    }
                                }
                                Err(e) => tracing::warn!("non-utf8 binary frame: {e}"),
                            }
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                        Some(Ok(Message::Close(frame))) => {
                            tracing::debug!(?frame, "server closed socket");
                            break true;
                        }
                        Some(Err(e)) => {
                            tracing::warn!("socket error: {e}");
                            break true;
                        }
                        None => {
                            tracing::debug!("socket stream ended");
                            break true;
                        }
                    },
                }
            };

            if closed {
                consecutive_failures += 1;
                if self.attempts_exhausted(consecutive_failures) {
                    break;
                }
            }
        }

        tracing::debug!("connect loop exited");
    }

    fn attempts_exhausted(&self, failures: u32) -> bool {
        match self.config.max_reconnect_attempts {
            Some(max) if failures >= max => {
                tracing::error!(max, "giving up after maximum reconnect attempts");
                true
            }
            _ => false,
        }
    }
}

/// Decode one text frame and forward it in receipt order
///
/// Returns `false` when the receiving side is gone and the client should
/// tear down. Malformed frames and unknown discriminants are logged and
/// skipped, never fatal.
fn forward_frame(inbound_tx: &mpsc::UnboundedSender<InboundMessage>, text: &str) -> bool {
    match serde_json::from_str::<InboundMessage>(text) {
        Ok(InboundMessage::Unknown) => {
            tracing::trace!(%text, "ignoring unknown frame type");
            true
        }
        Ok(message) => inbound_tx.send(message).is_ok(),
        Err(e) => {
            tracing::warn!("malformed frame: {e}: {text}");
            true
        }
    }
}
