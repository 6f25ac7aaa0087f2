use std::{sync::Arc, time::Duration};

use futures::{future::BoxFuture, SinkExt, StreamExt};
use shared::{domain::ChannelIdentity, protocol::OutboundFrame};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    auth::AccessTokenProvider, config::RealtimeSettings, dispatcher::EventDispatcher,
    error::ConnectError,
};

pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_AUTH_REJECTED: u16 = 4001;
pub const CLOSE_FORBIDDEN: u16 = 4003;

const OUTBOUND_QUEUE_CAPACITY: usize = 32;
const RECONNECT_EXHAUSTED_ERROR: &str = "connection lost, please refresh";
const TRANSPORT_ERROR: &str = "connection error";

/// Close codes that signal an intentional shutdown; everything else feeds
/// the backoff-reconnect path.
fn is_clean_close(code: u16) -> bool {
    matches!(code, CLOSE_NORMAL | CLOSE_AUTH_REJECTED | CLOSE_FORBIDDEN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

/// What the UI reads: the state badge, the current error text (if any), and
/// how many reconnect attempts have been consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub error: Option<String>,
    pub attempts: u32,
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            error: None,
            attempts: 0,
        }
    }
}

#[derive(Default)]
struct ManagerInner {
    connecting: bool,
    shutdown: bool,
    attempts: u32,
    outbound: Option<mpsc::Sender<Message>>,
    reader_task: Option<JoinHandle<()>>,
    writer_task: Option<JoinHandle<()>>,
    reconnect_task: Option<JoinHandle<()>>,
}

/// Owns one socket bound to one channel identity for its whole lifetime,
/// recovering from unexpected drops with bounded exponential backoff.
///
/// All failures stay local: they are published through the snapshot channel
/// and never escalate beyond a visibly disconnected chat view.
pub struct ConnectionManager {
    settings: RealtimeSettings,
    identity: ChannelIdentity,
    tokens: Arc<dyn AccessTokenProvider>,
    dispatcher: Arc<EventDispatcher>,
    inner: Mutex<ManagerInner>,
    snapshot: watch::Sender<ConnectionSnapshot>,
}

impl ConnectionManager {
    pub fn new(
        settings: RealtimeSettings,
        identity: ChannelIdentity,
        tokens: Arc<dyn AccessTokenProvider>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Arc<Self> {
        let (snapshot, _) = watch::channel(ConnectionSnapshot::default());
        Arc::new(Self {
            settings,
            identity,
            tokens,
            dispatcher,
            inner: Mutex::new(ManagerInner::default()),
            snapshot,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshot.borrow().state
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.snapshot.subscribe()
    }

    fn publish(&self, update: impl FnOnce(&mut ConnectionSnapshot)) {
        self.snapshot.send_modify(update);
    }

    /// Open the socket for this channel. No-op when already connecting or
    /// already open. All failures surface through the snapshot, never as a
    /// return value.
    ///
    /// Returns a boxed future: the reconnect timer re-enters `connect` while
    /// a prior call's future is still alive, which an opaque `async fn`
    /// future cannot express.
    pub fn connect(self: &Arc<Self>) -> BoxFuture<'static, ()> {
        let client = Arc::clone(self);
        Box::pin(async move { client.connect_inner().await })
    }

    async fn connect_inner(self: &Arc<Self>) {
        let attempts = {
            let mut inner = self.inner.lock().await;
            if inner.connecting || self.state() == ConnectionState::Connected {
                return;
            }
            inner.connecting = true;
            inner.shutdown = false;
            inner.attempts
        };

        self.publish(|snapshot| {
            snapshot.state = if attempts == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting
            };
        });

        let Some(token) = self.tokens.access_token().await else {
            self.inner.lock().await.connecting = false;
            warn!(
                channel = self.identity.kind(),
                channel_id = self.identity.id(),
                "ws: connect refused, no access token"
            );
            self.publish(|snapshot| {
                snapshot.state = ConnectionState::Failed;
                snapshot.error = Some(ConnectError::NotAuthenticated.to_string());
            });
            return;
        };

        let uri = match self.connect_uri(&token) {
            Ok(uri) => uri,
            Err(err) => {
                self.inner.lock().await.connecting = false;
                error!(
                    channel = self.identity.kind(),
                    channel_id = self.identity.id(),
                    "ws: {err}"
                );
                self.publish(|snapshot| {
                    snapshot.state = ConnectionState::Failed;
                    snapshot.error = Some(err.to_string());
                });
                return;
            }
        };

        match connect_async(uri.as_str()).await {
            Ok((stream, _response)) => {
                let (mut ws_writer, mut ws_reader) = stream.split();
                let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE_CAPACITY);

                {
                    let mut inner = self.inner.lock().await;
                    inner.connecting = false;
                    inner.attempts = 0;
                    inner.outbound = Some(outbound_tx);
                }
                self.publish(|snapshot| {
                    snapshot.state = ConnectionState::Connected;
                    snapshot.error = None;
                    snapshot.attempts = 0;
                });
                info!(
                    channel = self.identity.kind(),
                    channel_id = self.identity.id(),
                    "ws: connected"
                );

                let writer_task = tokio::spawn(async move {
                    while let Some(message) = outbound_rx.recv().await {
                        if ws_writer.send(message).await.is_err() {
                            break;
                        }
                    }
                });

                let client = Arc::clone(self);
                let reader_task = tokio::spawn(async move {
                    let mut close_code: Option<u16> = None;
                    while let Some(message) = ws_reader.next().await {
                        match message {
                            Ok(Message::Text(text)) => client.dispatcher.dispatch(&text).await,
                            Ok(Message::Close(frame)) => {
                                close_code = frame.map(|frame| u16::from(frame.code));
                                break;
                            }
                            Ok(_) => {}
                            Err(err) => {
                                // Recovery is driven by the closed stream
                                // below; the error text is what the UI shows
                                // in the meantime.
                                warn!(
                                    channel = client.identity.kind(),
                                    channel_id = client.identity.id(),
                                    "ws: socket error: {err}"
                                );
                                client.publish(|snapshot| {
                                    snapshot.error = Some(TRANSPORT_ERROR.to_string());
                                });
                                break;
                            }
                        }
                    }
                    client.handle_closed(close_code).await;
                });

                let mut inner = self.inner.lock().await;
                inner.writer_task = Some(writer_task);
                inner.reader_task = Some(reader_task);
            }
            Err(err) => {
                self.inner.lock().await.connecting = false;
                warn!(
                    channel = self.identity.kind(),
                    channel_id = self.identity.id(),
                    "ws: connect failed: {err}"
                );
                self.schedule_reconnect().await;
            }
        }
    }

    /// Tear the connection down with a normal-closure frame. Idempotent and
    /// safe to call when never connected; cancels any pending reconnect.
    pub async fn disconnect(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.shutdown = true;
            inner.connecting = false;
            inner.attempts = 0;
            if let Some(task) = inner.reconnect_task.take() {
                task.abort();
            }
            if let Some(outbound) = inner.outbound.take() {
                let close = Message::Close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: "client disconnect".into(),
                }));
                let _ = outbound.try_send(close);
            }
            if let Some(task) = inner.reader_task.take() {
                task.abort();
            }
            // The writer drains the close frame and exits once its channel
            // sender is gone.
            inner.writer_task = None;
        }

        self.publish(|snapshot| {
            snapshot.state = ConnectionState::Disconnected;
            snapshot.error = None;
            snapshot.attempts = 0;
        });
        info!(
            channel = self.identity.kind(),
            channel_id = self.identity.id(),
            "ws: disconnected"
        );
    }

    /// Serialize and transmit a frame, but only while connected. Anything
    /// else is dropped on the floor: the UI disables send controls when not
    /// connected, so this is the defensive fallback, not the primary guard.
    pub async fn send(&self, frame: &OutboundFrame) {
        if self.state() != ConnectionState::Connected {
            debug!(
                channel = self.identity.kind(),
                channel_id = self.identity.id(),
                "ws: dropping outbound frame while not connected"
            );
            return;
        }

        let inner = self.inner.lock().await;
        let Some(outbound) = inner.outbound.as_ref() else {
            return;
        };
        match serde_json::to_string(frame) {
            Ok(text) => {
                if outbound.try_send(Message::Text(text)).is_err() {
                    debug!(
                        channel = self.identity.kind(),
                        channel_id = self.identity.id(),
                        "ws: outbound queue full, dropping frame"
                    );
                }
            }
            Err(err) => {
                warn!(
                    channel = self.identity.kind(),
                    channel_id = self.identity.id(),
                    "ws: failed to serialize outbound frame: {err}"
                );
            }
        }
    }

    fn connect_uri(&self, token: &str) -> Result<Url, ConnectError> {
        let base = self.settings.ws_base_url.trim_end_matches('/');
        let raw = format!("{base}/{}/{}", self.identity.kind(), self.identity.id());
        let mut uri = Url::parse(&raw).map_err(|source| ConnectError::InvalidBaseUrl {
            url: raw.clone(),
            source,
        })?;
        uri.query_pairs_mut().append_pair("token", token);
        Ok(uri)
    }

    async fn handle_closed(self: &Arc<Self>, close_code: Option<u16>) {
        let shutdown = {
            let mut inner = self.inner.lock().await;
            inner.outbound = None;
            inner.reader_task = None;
            if let Some(task) = inner.writer_task.take() {
                task.abort();
            }
            inner.shutdown
        };

        // disconnect() already published its own terminal state.
        if shutdown {
            return;
        }

        match close_code {
            Some(code) if is_clean_close(code) => {
                info!(
                    channel = self.identity.kind(),
                    channel_id = self.identity.id(),
                    code,
                    "ws: closed by server, not reconnecting"
                );
                self.publish(|snapshot| {
                    snapshot.state = ConnectionState::Disconnected;
                });
            }
            _ => {
                warn!(
                    channel = self.identity.kind(),
                    channel_id = self.identity.id(),
                    code = close_code,
                    "ws: closed unexpectedly"
                );
                self.schedule_reconnect().await;
            }
        }
    }

    async fn schedule_reconnect(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        if inner.shutdown {
            return;
        }

        let attempt = inner.attempts;
        if attempt >= self.settings.max_reconnect_attempts {
            drop(inner);
            error!(
                channel = self.identity.kind(),
                channel_id = self.identity.id(),
                attempts = attempt,
                "ws: reconnect attempts exhausted"
            );
            self.publish(|snapshot| {
                snapshot.state = ConnectionState::Failed;
                snapshot.error = Some(RECONNECT_EXHAUSTED_ERROR.to_string());
            });
            return;
        }

        let delay = backoff_delay(&self.settings, attempt);
        inner.attempts = attempt + 1;
        let client = Arc::clone(self);
        inner.reconnect_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            client.connect().await;
        }));
        drop(inner);

        self.publish(|snapshot| {
            snapshot.state = ConnectionState::Reconnecting;
            snapshot.attempts = attempt + 1;
        });
        warn!(
            channel = self.identity.kind(),
            channel_id = self.identity.id(),
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "ws: reconnect scheduled"
        );
    }
}

/// Delay before the (attempt+1)th connect: `min(base * 2^attempt, cap)`.
pub(crate) fn backoff_delay(settings: &RealtimeSettings, attempt: u32) -> Duration {
    settings
        .reconnect_base_delay
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(settings.reconnect_max_delay)
}

#[cfg(test)]
#[path = "tests/connection_tests.rs"]
mod tests;
