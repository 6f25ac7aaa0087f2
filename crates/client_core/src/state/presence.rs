use std::collections::HashMap;

use shared::{domain::UserId, protocol::Participant};

/// Online users of a group channel. Seeded by the `online_users` snapshot
/// sent once after connect (full replacement, never a merge), then patched
/// by join/leave events. The client never re-syncs on its own; a missed
/// leave stays stale until the next reconnect snapshot.
#[derive(Debug, Default)]
pub struct PresenceSet {
    online: HashMap<UserId, Participant>,
}

impl PresenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an `online_users` snapshot: the prior set is discarded entirely.
    pub fn replace_all(&mut self, participants: Vec<Participant>) {
        self.online = participants
            .into_iter()
            .map(|participant| (participant.user_id, participant))
            .collect();
    }

    pub fn join(&mut self, participant: Participant) {
        self.online.insert(participant.user_id, participant);
    }

    pub fn leave(&mut self, user_id: UserId) -> bool {
        self.online.remove(&user_id).is_some()
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.online.contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.online.len()
    }

    pub fn is_empty(&self) -> bool {
        self.online.is_empty()
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.online.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: i64, username: &str) -> Participant {
        Participant {
            user_id: UserId(id),
            username: username.to_string(),
            profile_picture: None,
        }
    }

    #[test]
    fn snapshot_replaces_the_entire_prior_set() {
        let mut presence = PresenceSet::new();
        presence.replace_all(vec![participant(1, "alice"), participant(2, "bob")]);
        presence.join(participant(3, "carol"));

        presence.replace_all(vec![participant(4, "dave")]);

        assert_eq!(presence.len(), 1);
        assert!(presence.is_online(UserId(4)));
        assert!(!presence.is_online(UserId(1)));
        assert!(!presence.is_online(UserId(3)));
    }

    #[test]
    fn join_and_leave_patch_incrementally() {
        let mut presence = PresenceSet::new();
        presence.replace_all(vec![participant(1, "alice")]);

        presence.join(participant(2, "bob"));
        assert!(presence.is_online(UserId(2)));

        assert!(presence.leave(UserId(1)));
        assert!(!presence.is_online(UserId(1)));
        assert_eq!(presence.len(), 1);
    }

    #[test]
    fn leaving_an_unknown_user_is_a_no_op() {
        let mut presence = PresenceSet::new();
        assert!(!presence.leave(UserId(9)));
        assert!(presence.is_empty());
    }
}
