use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(GroupId);
id_newtype!(ConversationId);
id_newtype!(MessageId);

/// The channel a realtime connection is bound to. One connection manager
/// owns exactly one identity for its whole lifetime; switching channels
/// means tearing the manager down and creating a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelIdentity {
    Group(GroupId),
    Conversation(ConversationId),
}

impl ChannelIdentity {
    /// Path segment used when building the connection URI.
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelIdentity::Group(_) => "group",
            ChannelIdentity::Conversation(_) => "dm",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            ChannelIdentity::Group(group_id) => group_id.0,
            ChannelIdentity::Conversation(conversation_id) => conversation_id.0,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ChannelIdentity::Group(_))
    }
}
