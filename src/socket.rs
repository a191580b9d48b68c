//! WebSocket-backed channel registry: one shared connection, many logical
//! channels.
//!
//! A single background task owns the socket and handles everything:
//! outgoing subscribe/unsubscribe frames, incoming event dispatch, keepalive
//! pings, and graceful shutdown. Each logical channel name and its bind set
//! is exclusively owned by the subscription that created it.

use crate::error::{LiveLinkError, Result};
use crate::models::UpdateEnvelope;
use crate::registry::{ChannelHandle, ChannelRegistry, UpdateHandler};
use crate::timeouts::LiveLinkTimeouts;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const MAX_TEXT_FRAME_BYTES: usize = 16 << 20; // 16 MiB

/// Capacity of the outgoing frame queue between the public API and the
/// background socket task.
const FRAME_QUEUE_CAPACITY: usize = 256;

/// Frames sent from client to the delivery server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    /// Start receiving events published on `channel`.
    Subscribe { channel: String },
    /// Stop receiving events published on `channel`.
    Unsubscribe { channel: String },
}

/// Frames received from the delivery server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame {
    /// One event published on a channel.
    Event {
        channel: String,
        event: String,
        data: JsonValue,
    },
}

#[derive(Default)]
struct ChannelEntry {
    /// (event name, handler) pairs bound on this channel.
    bindings: Vec<(String, UpdateHandler)>,
}

type ChannelMap = Arc<Mutex<HashMap<String, ChannelEntry>>>;

fn lock_channels(channels: &ChannelMap) -> MutexGuard<'_, HashMap<String, ChannelEntry>> {
    channels.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Map an http(s) base URL onto the delivery service's ws(s) endpoint.
fn resolve_socket_url(base_url: &str) -> Result<String> {
    let base = Url::parse(base_url.trim()).map_err(|e| {
        LiveLinkError::ConfigurationError(format!("Invalid base_url '{}': {}", base_url, e))
    })?;

    if base.host_str().is_none() {
        return Err(LiveLinkError::ConfigurationError(
            "base_url must include a host".to_string(),
        ));
    }

    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(LiveLinkError::ConfigurationError(format!(
                "Unsupported base_url scheme '{}'; expected http(s) or ws(s)",
                other
            )));
        }
    };

    let mut url = base;
    url.set_scheme(scheme).map_err(|_| {
        LiveLinkError::ConfigurationError("Failed to set WebSocket URL scheme".to_string())
    })?;
    url.set_path("/v1/ws");
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.to_string())
}

/// Route one event frame to the handlers bound for `(channel, event)`.
fn dispatch_event(channels: &ChannelMap, channel: &str, event: &str, data: JsonValue) {
    let handlers: Vec<UpdateHandler> = {
        let map = lock_channels(channels);
        match map.get(channel) {
            Some(entry) => entry
                .bindings
                .iter()
                .filter(|(bound_event, _)| bound_event == event)
                .map(|(_, handler)| handler.clone())
                .collect(),
            None => {
                debug!("[SOCKET] event for unknown channel '{}'", channel);
                return;
            }
        }
    };

    if handlers.is_empty() {
        return;
    }

    let envelope: UpdateEnvelope = match serde_json::from_value(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("[SOCKET] undecodable envelope on '{}': {}", channel, e);
            return;
        }
    };

    for handler in handlers {
        handler(envelope.clone());
    }
}

/// Background task that owns the WebSocket stream.
///
/// Responsibilities:
/// - Send queued subscribe/unsubscribe frames
/// - Parse event frames and dispatch to bound handlers
/// - Send periodic keepalive pings when idle
/// - Graceful shutdown on close signal, registry drop, or stream end
async fn socket_loop(
    mut ws: WsStream,
    channels: ChannelMap,
    mut frame_rx: mpsc::Receiver<ClientFrame>,
    close_rx: oneshot::Receiver<()>,
    keepalive: Option<Duration>,
) {
    tokio::pin!(close_rx);

    let keepalive_dur = keepalive.unwrap_or(Duration::MAX);
    let has_keepalive = keepalive.is_some();
    let mut idle_deadline = TokioInstant::now() + keepalive_dur;

    loop {
        let idle_sleep = tokio::time::sleep_until(idle_deadline);
        tokio::pin!(idle_sleep);

        tokio::select! {
            biased;

            // Highest priority: graceful shutdown requested by close() / Drop.
            _ = &mut close_rx => {
                let _ = ws.close(None).await;
                debug!("[SOCKET] closed by client");
                return;
            }

            // Outgoing frames queued by subscribe/unsubscribe.
            frame = frame_rx.recv() => {
                let Some(frame) = frame else {
                    // Registry handle dropped; shut the connection down.
                    let _ = ws.close(None).await;
                    return;
                };
                match serde_json::to_string(&frame) {
                    Ok(payload) => {
                        if let Err(e) = ws.send(Message::Text(payload.into())).await {
                            warn!("[SOCKET] send failed: {}", e);
                            return;
                        }
                    }
                    Err(e) => warn!("[SOCKET] frame serialization failed: {}", e),
                }
                idle_deadline = TokioInstant::now() + keepalive_dur;
            }

            // Keepalive idle timer.
            _ = &mut idle_sleep, if has_keepalive => {
                if let Err(e) = ws.send(Message::Ping(Bytes::new())).await {
                    warn!("[SOCKET] keepalive ping failed: {}", e);
                    return;
                }
                idle_deadline = TokioInstant::now() + keepalive_dur;
            }

            // Incoming frames.
            msg = ws.next() => {
                idle_deadline = TokioInstant::now() + keepalive_dur;
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_TEXT_FRAME_BYTES {
                            warn!(
                                "[SOCKET] frame too large ({} bytes > {} bytes)",
                                text.len(),
                                MAX_TEXT_FRAME_BYTES
                            );
                            continue;
                        }
                        match serde_json::from_str::<ServerFrame>(&text) {
                            Ok(ServerFrame::Event { channel, event, data }) => {
                                dispatch_event(&channels, &channel, &event, data);
                            }
                            Err(e) => debug!("[SOCKET] unrecognized frame: {}", e),
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = ws.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        debug!("[SOCKET] server closed connection");
                        return;
                    }
                    Some(Err(e)) => {
                        warn!("[SOCKET] websocket error: {}", e);
                        return;
                    }
                    None => {
                        debug!("[SOCKET] stream ended");
                        return;
                    }
                }
            }
        }
    }
}

/// Bundled [`ChannelRegistry`] implementation over one shared WebSocket
/// connection.
///
/// # Examples
///
/// ```rust,no_run
/// use live_link::{LiveLinkTimeouts, SocketRegistry};
///
/// # async fn example() -> live_link::Result<()> {
/// let registry = SocketRegistry::connect(
///     "http://localhost:3000",
///     &LiveLinkTimeouts::default(),
/// ).await?;
/// # Ok(())
/// # }
/// ```
pub struct SocketRegistry {
    channels: ChannelMap,
    frame_tx: mpsc::Sender<ClientFrame>,
    /// `None` after `close()` has been called (or consumed by `Drop`).
    close_tx: Mutex<Option<oneshot::Sender<()>>>,
    _task: JoinHandle<()>,
}

impl SocketRegistry {
    /// Connect to the delivery service and spawn the background socket task.
    pub async fn connect(base_url: &str, timeouts: &LiveLinkTimeouts) -> Result<Self> {
        let url = resolve_socket_url(base_url)?;

        let connect = connect_async(&url);
        let connect_result = if LiveLinkTimeouts::is_no_timeout(timeouts.connection_timeout) {
            connect.await
        } else {
            tokio::time::timeout(timeouts.connection_timeout, connect)
                .await
                .map_err(|_| {
                    LiveLinkError::TimeoutError(format!(
                        "Connection timeout ({:?})",
                        timeouts.connection_timeout
                    ))
                })?
        };
        let (stream, _) = connect_result
            .map_err(|e| LiveLinkError::ChannelError(format!("Connection failed: {}", e)))?;
        debug!("[SOCKET] connected to {}", url);

        let channels: ChannelMap = Arc::new(Mutex::new(HashMap::new()));
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel();
        let keepalive = if timeouts.keepalive_interval.is_zero() {
            None
        } else {
            Some(timeouts.keepalive_interval)
        };

        let task = tokio::spawn(socket_loop(
            stream,
            channels.clone(),
            frame_rx,
            close_rx,
            keepalive,
        ));

        Ok(Self {
            channels,
            frame_tx,
            close_tx: Mutex::new(Some(close_tx)),
            _task: task,
        })
    }

    /// Close the connection gracefully. Safe to call multiple times.
    pub fn close(&self) {
        let tx = self
            .close_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = tx {
            let _ = tx.send(());
        }
    }
}

impl ChannelRegistry for SocketRegistry {
    fn subscribe_to_channel(&self, name: &str) -> Result<Arc<dyn ChannelHandle>> {
        {
            let mut map = lock_channels(&self.channels);
            map.entry(name.to_string()).or_default();
        }
        self.frame_tx
            .try_send(ClientFrame::Subscribe {
                channel: name.to_string(),
            })
            .map_err(|e| {
                LiveLinkError::ChannelError(format!("Failed to queue subscribe frame: {}", e))
            })?;

        Ok(Arc::new(SocketChannel {
            name: name.to_string(),
            channels: self.channels.clone(),
        }))
    }

    fn unsubscribe_from_channel(&self, name: &str) -> Result<()> {
        let removed = lock_channels(&self.channels).remove(name).is_some();
        if removed {
            self.frame_tx
                .try_send(ClientFrame::Unsubscribe {
                    channel: name.to_string(),
                })
                .map_err(|e| {
                    LiveLinkError::ChannelError(format!(
                        "Failed to queue unsubscribe frame: {}",
                        e
                    ))
                })?;
        }
        Ok(())
    }
}

impl Drop for SocketRegistry {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle to one named channel on a [`SocketRegistry`].
struct SocketChannel {
    name: String,
    channels: ChannelMap,
}

impl ChannelHandle for SocketChannel {
    fn bind(&self, event: &str, handler: UpdateHandler) -> Result<()> {
        let mut map = lock_channels(&self.channels);
        let entry = map.get_mut(&self.name).ok_or_else(|| {
            LiveLinkError::ChannelError(format!("Channel '{}' is not subscribed", self.name))
        })?;
        entry.bindings.push((event.to_string(), handler));
        Ok(())
    }

    fn unbind(&self, event: &str, handler: &UpdateHandler) -> Result<()> {
        if let Some(entry) = lock_channels(&self.channels).get_mut(&self.name) {
            entry
                .bindings
                .retain(|(bound_event, bound)| !(bound_event == event && Arc::ptr_eq(bound, handler)));
        }
        Ok(())
    }
}
