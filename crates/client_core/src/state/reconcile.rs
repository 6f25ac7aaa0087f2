use chrono::{DateTime, Utc};
use shared::domain::{ChannelIdentity, UserId};

/// One rendered chat message. Identity is either a positive server-issued id
/// or a negative local placeholder id (`-(epoch millis)` at send time) that
/// lives only until the server echo confirms it.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub id: i64,
    pub channel: ChannelIdentity,
    pub sender_id: UserId,
    pub username: String,
    pub profile_picture: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Read-receipt flag; only meaningful on direct-message channels.
    pub read: bool,
}

impl MessageRecord {
    pub fn is_placeholder(&self) -> bool {
        self.id < 0
    }
}

/// Append-ordered message list with placeholder/echo reconciliation.
///
/// Invariant: at most one record per logical message. The protocol has no
/// request/response correlation id; a placeholder and its server echo are
/// matched by sender + content, which is safe as long as one user does not
/// double-send identical content inside a single unresolved round-trip (a
/// known, accepted limitation).
#[derive(Debug)]
pub struct MessageLog {
    channel: ChannelIdentity,
    records: Vec<MessageRecord>,
}

impl MessageLog {
    pub fn new(channel: ChannelIdentity) -> Self {
        Self {
            channel,
            records: Vec::new(),
        }
    }

    /// Synthesize and append the optimistic placeholder for a local send.
    /// Call this before the network transmit so the message renders
    /// immediately; returns the placeholder id.
    pub fn push_local(
        &mut self,
        sender_id: UserId,
        username: impl Into<String>,
        content: impl Into<String>,
        image_url: Option<String>,
        now: DateTime<Utc>,
    ) -> i64 {
        let id = -now.timestamp_millis();
        self.records.push(MessageRecord {
            id,
            channel: self.channel,
            sender_id,
            username: username.into(),
            profile_picture: None,
            content: content.into(),
            image_url,
            created_at: now,
            read: false,
        });
        id
    }

    /// Merge a server-confirmed message: replace the entry with the same id,
    /// or the placeholder whose sender and content match exactly; otherwise
    /// append. Display order stays arrival order, no timestamp re-sorting.
    pub fn apply_incoming(&mut self, incoming: MessageRecord) {
        let matched = self.records.iter().position(|existing| {
            existing.id == incoming.id
                || (existing.is_placeholder()
                    && existing.sender_id == incoming.sender_id
                    && existing.content == incoming.content)
        });

        match matched {
            Some(index) => self.records[index] = incoming,
            None => self.records.push(incoming),
        }
    }

    /// Mark everything the reader did not send as read (DM read receipts).
    pub fn apply_read(&mut self, reader_id: UserId) {
        for record in self
            .records
            .iter_mut()
            .filter(|record| record.sender_id != reader_id)
        {
            record.read = true;
        }
    }

    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use shared::domain::GroupId;

    use super::*;

    fn log() -> MessageLog {
        MessageLog::new(ChannelIdentity::Group(GroupId(9)))
    }

    fn incoming(id: i64, sender: i64, content: &str) -> MessageRecord {
        MessageRecord {
            id,
            channel: ChannelIdentity::Group(GroupId(9)),
            sender_id: UserId(sender),
            username: format!("user{sender}"),
            profile_picture: None,
            content: content.to_string(),
            image_url: None,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).single().expect("ts"),
            read: false,
        }
    }

    #[test]
    fn placeholder_id_is_negated_send_time() {
        let mut log = log();
        let now = Utc.timestamp_opt(1_700_000_123, 0).single().expect("ts");

        let id = log.push_local(UserId(1), "alice", "hello", None, now);

        assert_eq!(id, -now.timestamp_millis());
        assert!(log.records()[0].is_placeholder());
    }

    #[test]
    fn server_echo_collapses_placeholder_into_one_confirmed_record() {
        let mut log = log();
        let now = Utc::now();
        log.push_local(UserId(1), "alice", "hello", None, now);
        assert_eq!(log.len(), 1);
        assert!(log.records()[0].id < 0);

        log.apply_incoming(incoming(42, 1, "hello"));

        assert_eq!(log.len(), 1);
        assert_eq!(log.records()[0].id, 42);
        assert_eq!(log.records()[0].content, "hello");
    }

    #[test]
    fn echo_with_same_content_from_other_sender_does_not_collapse() {
        let mut log = log();
        log.push_local(UserId(1), "alice", "hello", None, Utc::now());

        log.apply_incoming(incoming(42, 2, "hello"));

        assert_eq!(log.len(), 2);
        assert!(log.records()[0].is_placeholder());
        assert_eq!(log.records()[1].id, 42);
    }

    #[test]
    fn duplicate_server_id_refreshes_in_place() {
        let mut log = log();
        log.apply_incoming(incoming(42, 1, "hello"));
        log.apply_incoming(incoming(7, 2, "other"));

        let mut refreshed = incoming(42, 1, "hello (edited)");
        refreshed.read = true;
        log.apply_incoming(refreshed);

        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].content, "hello (edited)");
        assert!(log.records()[0].read);
        // Arrival order is preserved.
        assert_eq!(log.records()[1].id, 7);
    }

    #[test]
    fn unmatched_messages_append_in_arrival_order() {
        let mut log = log();
        log.apply_incoming(incoming(3, 2, "first"));
        log.apply_incoming(incoming(1, 2, "second"));

        let ids: Vec<i64> = log.records().iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn read_receipt_marks_only_messages_the_reader_did_not_send() {
        let mut log = log();
        log.apply_incoming(incoming(1, 1, "mine"));
        log.apply_incoming(incoming(2, 2, "theirs"));

        log.apply_read(UserId(2));

        assert!(log.records()[0].read);
        assert!(!log.records()[1].read);
    }
}
