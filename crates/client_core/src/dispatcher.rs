use chrono::Utc;
use shared::{
    domain::{ChannelIdentity, UserId},
    protocol::{InboundFrame, Participant},
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::state::reconcile::MessageRecord;

pub type MessageCallback = Box<dyn Fn(MessageRecord) + Send + Sync>;
pub type TypingCallback = Box<dyn Fn(UserId, String) + Send + Sync>;
pub type UserJoinedCallback = Box<dyn Fn(Participant) + Send + Sync>;
pub type UserLeftCallback = Box<dyn Fn(UserId, String) + Send + Sync>;
pub type OnlineUsersCallback = Box<dyn Fn(Vec<Participant>) + Send + Sync>;
pub type ReadCallback = Box<dyn Fn(UserId) + Send + Sync>;

/// The registered event handlers, one optional slot per event kind.
/// Re-registering is an explicit whole-table swap via
/// [`EventDispatcher::set_callbacks`], never an implicit side effect.
#[derive(Default)]
pub struct CallbackTable {
    pub on_message: Option<MessageCallback>,
    pub on_typing: Option<TypingCallback>,
    pub on_user_joined: Option<UserJoinedCallback>,
    pub on_user_left: Option<UserLeftCallback>,
    pub on_online_users: Option<OnlineUsersCallback>,
    pub on_read: Option<ReadCallback>,
}

/// Translates raw inbound frames into callback invocations, one per frame,
/// in socket arrival order. No retry, no backpressure; malformed frames are
/// noise, not faults.
pub struct EventDispatcher {
    identity: ChannelIdentity,
    local_user: UserId,
    callbacks: RwLock<CallbackTable>,
}

impl EventDispatcher {
    pub fn new(identity: ChannelIdentity, local_user: UserId) -> Self {
        Self {
            identity,
            local_user,
            callbacks: RwLock::new(CallbackTable::default()),
        }
    }

    pub async fn set_callbacks(&self, callbacks: CallbackTable) {
        *self.callbacks.write().await = callbacks;
    }

    pub async fn dispatch(&self, raw: &str) {
        let frame = match serde_json::from_str::<InboundFrame>(raw) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(
                    channel = self.identity.kind(),
                    channel_id = self.identity.id(),
                    "ws: discarding malformed frame: {err}"
                );
                return;
            }
        };

        let callbacks = self.callbacks.read().await;
        match frame {
            InboundFrame::Message {
                message_id,
                user_id,
                username,
                profile_picture,
                content,
                image_url,
                timestamp,
            } => {
                // A message must carry text or an image; never surface a
                // partial record.
                if content.is_none() && image_url.is_none() {
                    debug!(
                        channel = self.identity.kind(),
                        channel_id = self.identity.id(),
                        message_id = message_id.0,
                        "ws: dropping message frame without content or image"
                    );
                    return;
                }
                if let Some(on_message) = callbacks.on_message.as_ref() {
                    on_message(MessageRecord {
                        id: message_id.0,
                        channel: self.identity,
                        sender_id: user_id,
                        username,
                        profile_picture,
                        content: content.unwrap_or_default(),
                        image_url,
                        created_at: timestamp.unwrap_or_else(Utc::now),
                        read: false,
                    });
                }
            }
            InboundFrame::Typing { user_id, username } => {
                // Never show "you are typing" for the local user's own echo.
                if user_id == self.local_user {
                    return;
                }
                if let Some(on_typing) = callbacks.on_typing.as_ref() {
                    on_typing(user_id, username);
                }
            }
            InboundFrame::Read { user_id } => {
                if self.identity.is_group() {
                    return;
                }
                if let Some(on_read) = callbacks.on_read.as_ref() {
                    on_read(user_id);
                }
            }
            InboundFrame::UserJoined {
                user_id,
                username,
                profile_picture,
            } => {
                if !self.identity.is_group() {
                    return;
                }
                if let Some(on_user_joined) = callbacks.on_user_joined.as_ref() {
                    on_user_joined(Participant {
                        user_id,
                        username,
                        profile_picture,
                    });
                }
            }
            InboundFrame::UserLeft { user_id, username } => {
                if !self.identity.is_group() {
                    return;
                }
                if let Some(on_user_left) = callbacks.on_user_left.as_ref() {
                    on_user_left(user_id, username);
                }
            }
            InboundFrame::OnlineUsers { online_users } => {
                if !self.identity.is_group() {
                    return;
                }
                if let Some(on_online_users) = callbacks.on_online_users.as_ref() {
                    on_online_users(online_users);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
