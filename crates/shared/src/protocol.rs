use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{MessageId, UserId};

/// Frames the client writes to the socket. One JSON object per send.
///
/// `read` is only meaningful on a direct-message channel; the group variant
/// never emits it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Message {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
    Typing,
    Read,
}

/// One online participant as carried by presence frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub user_id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Frames the server broadcasts to channel participants.
///
/// The discriminator is the `type` field; anything that fails to parse into
/// this closed set is discarded by the dispatcher. `read` arrives only on
/// direct-message channels; `user_joined`/`user_left`/`online_users` only on
/// group channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    Message {
        message_id: MessageId,
        // Group broadcasts carry `user_id`, DM broadcasts `sender_id`.
        #[serde(alias = "sender_id")]
        user_id: UserId,
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        profile_picture: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },
    Typing {
        user_id: UserId,
        username: String,
    },
    Read {
        user_id: UserId,
    },
    UserJoined {
        user_id: UserId,
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        profile_picture: Option<String>,
    },
    UserLeft {
        user_id: UserId,
        username: String,
    },
    OnlineUsers {
        online_users: Vec<Participant>,
    },
}
