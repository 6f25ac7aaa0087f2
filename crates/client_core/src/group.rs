use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use shared::{
    domain::{ChannelIdentity, GroupId, UserId},
    protocol::OutboundFrame,
};
use tokio::sync::{watch, Mutex};

use crate::{
    auth::AccessTokenProvider,
    config::RealtimeSettings,
    connection::{ConnectionManager, ConnectionSnapshot, ConnectionState},
    dispatcher::{
        CallbackTable, EventDispatcher, MessageCallback, OnlineUsersCallback, TypingCallback,
        UserJoinedCallback, UserLeftCallback,
    },
    state::typing::{TypingThrottle, TypingTracker},
};

/// Handlers a group chat view registers. All optional, all invoked
/// synchronously from the dispatcher.
#[derive(Default)]
pub struct GroupCallbacks {
    pub on_message: Option<MessageCallback>,
    pub on_typing: Option<TypingCallback>,
    pub on_user_joined: Option<UserJoinedCallback>,
    pub on_user_left: Option<UserLeftCallback>,
    pub on_online_users: Option<OnlineUsersCallback>,
}

/// Realtime client for one group chat channel: a connection manager plus a
/// dispatcher bound to the group identity, with presence events enabled.
pub struct GroupChannelClient {
    manager: Arc<ConnectionManager>,
    dispatcher: Arc<EventDispatcher>,
    typing_throttle: Mutex<TypingThrottle>,
    typing_stale_after: Duration,
    typing_sweep_interval: Duration,
}

impl GroupChannelClient {
    pub fn new(
        settings: RealtimeSettings,
        group_id: GroupId,
        local_user: UserId,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        let identity = ChannelIdentity::Group(group_id);
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

    pub async fn set_callbacks(&self, callbacks: GroupCallbacks) {
        self.dispatcher
            .set_callbacks(CallbackTable {
                on_message: callbacks.on_message,
                on_typing: callbacks.on_typing,
                on_user_joined: callbacks.on_user_joined,
                on_user_left: callbacks.on_user_left,
                on_online_users: callbacks.on_online_users,
                on_read: None,
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
}

#[cfg(test)]
mod tests {
    use crate::auth::StaticTokenProvider;

    use super::*;

    #[test]
    fn typing_tracker_is_configured_from_settings() {
        let settings = RealtimeSettings {
            typing_stale_after: Duration::from_millis(100),
            typing_sweep_interval: Duration::from_millis(40),
            ..RealtimeSettings::default()
        };
        let client = GroupChannelClient::new(
            settings,
            GroupId(9),
            UserId(1),
            Arc::new(StaticTokenProvider::new("sekrit")),
        );

        assert_eq!(client.typing_sweep_interval(), Duration::from_millis(40));

        let mut tracker = client.typing_tracker();
        let base = Instant::now();
        tracker.note(UserId(2), "alice", base);
        assert!(!tracker.sweep(base + Duration::from_millis(99)));
        assert!(tracker.sweep(base + Duration::from_millis(100)));
        assert!(tracker.is_empty());
    }
}
