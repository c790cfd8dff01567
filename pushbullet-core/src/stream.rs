//! Realtime event stream.
//!
//! The service pushes account events (new pushes, device changes) over a
//! WebSocket authenticated by the token in its URL. [`StreamConnector`] keeps
//! at most one such connection open and hands out [`StreamHandle`]s to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::PushError;
use crate::session::mask_token;

/// Default stream endpoint; the token is appended as the last path segment.
pub const DEFAULT_STREAM_URL: &str = "wss://stream.pushbullet.com/websocket";

/// Buffered events per connection before the reader waits for the consumer.
const EVENT_BUFFER: usize = 64;

/// A message received on the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Keep-alive sent every 30 seconds.
    Nop,
    /// Something changed server side; `subtype` says what (`push`, `device`).
    Tickle { subtype: String },
    /// An ephemeral delivered to this account.
    Push { payload: Value },
    /// Any other message, passed through untouched.
    Other(Value),
}

impl StreamEvent {
    /// Decodes one text frame.
    pub fn parse(text: &str) -> Result<Self, PushError> {
        let value: Value = serde_json::from_str(text)?;
        let event = match value.get("type").and_then(Value::as_str) {
            Some("nop") => StreamEvent::Nop,
            Some("tickle") => StreamEvent::Tickle {
                subtype: value
                    .get("subtype")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            Some("push") => StreamEvent::Push {
                payload: value.get("push").cloned().unwrap_or(Value::Null),
            },
            _ => StreamEvent::Other(value),
        };
        Ok(event)
    }
}

/// An open connection as produced by a [`StreamOpener`].
pub struct StreamConnection {
    /// Decoded events, closed when the connection ends.
    pub events: mpsc::Receiver<StreamEvent>,
    /// Fires to ask the connection to shut down.
    pub shutdown: oneshot::Sender<()>,
    /// Cleared by the connection when it ends for any reason.
    pub alive: Arc<AtomicBool>,
}

/// Opens the underlying connection.
#[async_trait]
pub trait StreamOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<StreamConnection, PushError>;
}

/// Opens real WebSocket connections with `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketOpener;

#[async_trait]
impl StreamOpener for WebSocketOpener {
    async fn open(&self, url: &str) -> Result<StreamConnection, PushError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| PushError::Transport(format!("Stream connection failed: {}", e)))?;

        let (mut sender, mut receiver) = ws_stream.split();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let alive = Arc::new(AtomicBool::new(true));
        let reader_alive = alive.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                    msg = receiver.next() => match msg {
                        Some(Ok(Message::Text(text))) => match StreamEvent::parse(&text) {
                            Ok(event) => {
                                if tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::warn!("Ignoring stream message: {}", e),
                        },
                        Some(Ok(Message::Ping(data))) => {
                            let _ = sender.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {
                            // Binary and pong frames carry nothing for us
                        }
                        Some(Err(e)) => {
                            tracing::warn!("Stream error: {}", e);
                            break;
                        }
                    }
                }
            }
            reader_alive.store(false, Ordering::SeqCst);
            tracing::debug!("Stream reader finished");
        });

        Ok(StreamConnection {
            events: rx,
            shutdown: shutdown_tx,
            alive,
        })
    }
}

struct StreamShared {
    id: u64,
    events: tokio::sync::Mutex<mpsc::Receiver<StreamEvent>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    alive: Arc<AtomicBool>,
}

/// Shared access to the connector's connection.
///
/// Cloning a handle does not open anything; all clones read from the same
/// connection.
#[derive(Clone)]
pub struct StreamHandle {
    inner: Arc<StreamShared>,
}

impl StreamHandle {
    fn new(id: u64, connection: StreamConnection) -> Self {
        Self {
            inner: Arc::new(StreamShared {
                id,
                events: tokio::sync::Mutex::new(connection.events),
                shutdown: Mutex::new(Some(connection.shutdown)),
                alive: connection.alive,
            }),
        }
    }

    /// Sequence number of the connection, starting at 1.
    pub fn connection_id(&self) -> u64 {
        self.inner.id
    }

    /// True while the connection is open.
    pub fn is_valid(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }

    /// Returns true if both handles refer to the same connection.
    pub fn same_connection(&self, other: &StreamHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Waits for the next event. `None` once the connection is gone.
    pub async fn next_event(&self) -> Option<StreamEvent> {
        let mut events = self.inner.events.lock().await;
        let event = events.recv().await;
        if event.is_none() {
            self.inner.alive.store(false, Ordering::SeqCst);
        }
        event
    }

    /// Closes the connection for every handle.
    pub fn close(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
        let shutdown = match self.inner.shutdown.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(());
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("connection_id", &self.inner.id)
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Owns the single realtime connection of a client.
pub struct StreamConnector {
    base_url: String,
    opener: Arc<dyn StreamOpener>,
    current: tokio::sync::Mutex<Option<StreamHandle>>,
    opened: std::sync::atomic::AtomicU64,
}

impl StreamConnector {
    pub fn new(base_url: impl Into<String>, opener: Arc<dyn StreamOpener>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            opener,
            current: tokio::sync::Mutex::new(None),
            opened: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Full stream URL for a token.
    pub fn stream_url(&self, token: &str) -> String {
        format!("{}/{}", self.base_url, token)
    }

    /// Returns the open connection, opening one if there is none or the last
    /// one has ended.
    pub async fn connect(&self, token: &str) -> Result<StreamHandle, PushError> {
        let mut current = self.current.lock().await;

        if let Some(handle) = current.as_ref() {
            if handle.is_valid() {
                return Ok(handle.clone());
            }
            tracing::debug!("Stream connection {} ended, reopening", handle.connection_id());
        }

        tracing::info!(
            "Opening stream {}/{}",
            self.base_url,
            mask_token(token)
        );
        let connection = self.opener.open(&self.stream_url(token)).await?;
        let id = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = StreamHandle::new(id, connection);
        *current = Some(handle.clone());

        Ok(handle)
    }

    /// Handle to the current connection, valid or not.
    pub async fn current(&self) -> Option<StreamHandle> {
        self.current.lock().await.clone()
    }

    /// Closes and forgets the current connection.
    pub async fn disconnect(&self) {
        if let Some(handle) = self.current.lock().await.take() {
            handle.close();
        }
    }
}
