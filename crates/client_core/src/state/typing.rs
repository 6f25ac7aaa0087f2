use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use shared::domain::UserId;

#[derive(Debug, Clone)]
pub struct TypingEntry {
    pub username: String,
    pub last_signal: Instant,
}

/// Tracks who is typing without any explicit "stopped typing" signal: the
/// protocol has none, so entries expire after a staleness window measured
/// from the LAST signal. Methods take explicit instants so the window is
/// testable without sleeping.
#[derive(Debug)]
pub struct TypingTracker {
    stale_after: Duration,
    entries: HashMap<UserId, TypingEntry>,
}

impl TypingTracker {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            entries: HashMap::new(),
        }
    }

    /// Insert or refresh a typing signal.
    pub fn note(&mut self, user_id: UserId, username: impl Into<String>, now: Instant) {
        self.entries.insert(
            user_id,
            TypingEntry {
                username: username.into(),
                last_signal: now,
            },
        );
    }

    /// Drop a user's entry immediately. A received message from that user
    /// clears it: they finished typing by sending.
    pub fn clear(&mut self, user_id: UserId) -> bool {
        self.entries.remove(&user_id).is_some()
    }

    /// Prune entries whose last signal is at least the staleness window old.
    /// Returns whether anything was removed. Run this on a fixed tick.
    pub fn sweep(&mut self, now: Instant) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.last_signal) < self.stale_after);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indicator text for the current set of typists, or `None` when idle.
    pub fn indicator(&self) -> Option<String> {
        let mut names: Vec<&str> = self
            .entries
            .values()
            .map(|entry| entry.username.as_str())
            .collect();
        names.sort_unstable();

        match names.as_slice() {
            [] => None,
            [name] => Some(format!("{name} is typing")),
            [first, second] => Some(format!("{first} and {second} are typing")),
            _ => Some("Several people are typing".to_string()),
        }
    }
}

/// Rate limiter for outbound typing frames: the UI calls this on every
/// keystroke, but at most one frame per interval goes out.
#[derive(Debug)]
pub struct TypingThrottle {
    min_interval: Duration,
    last_sent: Option<Instant>,
}

impl TypingThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: None,
        }
    }

    pub fn should_send(&mut self, now: Instant) -> bool {
        match self.last_sent {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_sent = Some(now);
                true
            }
        }
    }
}
