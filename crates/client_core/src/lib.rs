pub mod auth;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod dm;
pub mod error;
pub mod group;
pub mod state;

pub use auth::{AccessTokenProvider, MissingTokenProvider, StaticTokenProvider};
pub use config::{load_settings, RealtimeSettings};
pub use connection::{ConnectionManager, ConnectionSnapshot, ConnectionState};
pub use dispatcher::{CallbackTable, EventDispatcher};
pub use dm::{DmCallbacks, DmChannelClient};
pub use group::{GroupCallbacks, GroupChannelClient};
pub use state::presence::PresenceSet;
pub use state::reconcile::{MessageLog, MessageRecord};
pub use state::typing::{TypingThrottle, TypingTracker};
