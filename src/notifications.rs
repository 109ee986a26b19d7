use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How long a notification stays visible unless dismissed by hand.
pub const NOTIFICATION_TTL_MS: i64 = 4_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Transient message queue: insertion-ordered, monotonic ids, time-based
/// eviction driven by the host calling [`sweep`].
///
/// [`sweep`]: NotificationQueue::sweep
#[derive(Clone, Debug, Default)]
pub struct NotificationQueue {
    entries: Vec<Notification>,
    next_id: u64,
}

impl NotificationQueue {
    pub fn push(&mut self, kind: NotificationKind, message: &str, now: DateTime<Utc>) -> u64 {
        self.next_id += 1;
        self.entries.push(Notification {
            id: self.next_id,
            kind,
            message: message.to_string(),
            created_at: now,
        });
        self.next_id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.entries.retain(|entry| entry.id != id);
    }

    /// Evicts entries older than the TTL. The host shell calls this from its
    /// render tick.
    pub fn sweep(&mut self, now: DateTime<Utc>) {
        let ttl = Duration::milliseconds(NOTIFICATION_TTL_MS);
        self.entries.retain(|entry| now - entry.created_at < ttl);
    }

    pub fn visible(&self) -> &[Notification] {
        &self.entries
    }

    pub fn last_of(&self, kind: NotificationKind) -> Option<&Notification> {
        self.entries.iter().rev().find(|entry| entry.kind == kind)
    }

    pub fn count_of(&self, kind: NotificationKind) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_order_is_insertion() {
        let mut queue = NotificationQueue::default();
        let start = Utc::now();
        let a = queue.push(NotificationKind::Success, "saved", start);
        let b = queue.push(NotificationKind::Error, "failed", start);
        assert!(b > a);
        let ids: Vec<u64> = queue.visible().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn sweep_evicts_only_expired_entries() {
        let mut queue = NotificationQueue::default();
        let start = Utc::now();
        queue.push(NotificationKind::Info, "old", start);
        queue.push(
            NotificationKind::Info,
            "fresh",
            start + Duration::milliseconds(3_500),
        );
        queue.sweep(start + Duration::milliseconds(NOTIFICATION_TTL_MS));
        let messages: Vec<&str> = queue.visible().iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["fresh"]);
    }

    #[test]
    fn dismiss_removes_immediately() {
        let mut queue = NotificationQueue::default();
        let start = Utc::now();
        let id = queue.push(NotificationKind::Success, "saved", start);
        queue.push(NotificationKind::Info, "loaded", start);
        queue.dismiss(id);
        assert_eq!(queue.visible().len(), 1);
        assert_eq!(queue.visible()[0].message, "loaded");
    }
}
