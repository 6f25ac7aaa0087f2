use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use shared::{
    domain::{ChannelIdentity, ConversationId, UserId},
    protocol::OutboundFrame,
};
use tokio::sync::{watch, Mutex};

use crate::{
    auth::AccessTokenProvider,
    config::RealtimeSettings,
    connection::{ConnectionManager, ConnectionSnapshot, ConnectionState},
    dispatcher::{CallbackTable, EventDispatcher, MessageCallback, ReadCallback, TypingCallback},
    state::typing::{TypingThrottle, TypingTracker},
};

/// Handlers a direct-message view registers. Presence events do not exist
/// on DM channels; read receipts do.
#[derive(Default)]
pub struct DmCallbacks {
    pub on_message: Option<MessageCallback>,
    pub on_typing: Option<TypingCallback>,
    pub on_read: Option<ReadCallback>,
}

/// Realtime client for one 1:1 conversation.
pub struct DmChannelClient {
    manager: Arc<ConnectionManager>,
    dispatcher: Arc<EventDispatcher>,
    typing_throttle: Mutex<TypingThrottle>,
    typing_stale_after: Duration,
    typing_sweep_interval: Duration,
}

impl DmChannelClient {
    pub fn new(
        settings: RealtimeSettings,
        conversation_id: ConversationId,
        local_user: UserId,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        let identity = ChannelIdentity::Conversation(conversation_id);
        let dispatcher = Arc::new(EventDispatcher::new(identity, local_user));
        let typing_throttle = Mutex::new(TypingThrottle::new(settings.typing_throttle));
        let typing_stale_after = settings.typing_stale_after;
        let typing_sweep_interval = settings.typing_sweep_interval;
        let manager = ConnectionManager::new(settings, identity, tokens, Arc::clone(&dispatcher));
        Self {
            manager,
            dispatcher,
            typing_throttle,
            typing_stale_after,
            typing_sweep_interval,
        }
    }

    /// Tracker for inbound typing indicators, preconfigured with this
    /// client's staleness window. The consuming view owns it and calls
    /// `sweep` on the cadence of [`Self::typing_sweep_interval`].
    pub fn typing_tracker(&self) -> TypingTracker {
        TypingTracker::new(self.typing_stale_after)
    }

    pub fn typing_sweep_interval(&self) -> Duration {
        self.typing_sweep_interval
    }

    pub async fn set_callbacks(&self, callbacks: DmCallbacks) {
        self.dispatcher
            .set_callbacks(CallbackTable {
                on_message: callbacks.on_message,
                on_typing: callbacks.on_typing,
                on_user_joined: None,
                on_user_left: None,
                on_online_users: None,
                on_read: callbacks.on_read,
            })
            .await;
    }

    pub async fn connect(&self) {
        self.manager.connect().await;
    }

    /// Must run when the view unmounts: cancels any pending reconnect and
    /// closes with the normal code before further state updates.
    pub async fn disconnect(&self) {
        self.manager.disconnect().await;
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.manager.subscribe_state()
    }

    pub async fn send_message(&self, content: impl Into<String>, image_url: Option<String>) {
        self.manager
            .send(&OutboundFrame::Message {
                content: content.into(),
                image_url,
            })
            .await;
    }

    /// Call on every local keystroke; at most one typing frame per throttle
    /// window actually goes out.
    pub async fn notify_typing(&self) {
        let should_send = self.typing_throttle.lock().await.should_send(Instant::now());
        if should_send {
            self.manager.send(&OutboundFrame::Typing).await;
        }
    }

    /// Tell the peer everything visible has been read.
    pub async fn send_read(&self) {
        self.manager.send(&OutboundFrame::Read).await;
    }
}
