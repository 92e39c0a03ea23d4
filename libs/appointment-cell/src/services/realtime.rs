// libs/appointment-cell/src/services/realtime.rs
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

const FEED_CAPACITY: usize = 256;
/// Deleted ids remembered per viewer. A listener lagging further than the
/// feed capacity skips those events anyway.
const TOMBSTONE_CAPACITY: usize = FEED_CAPACITY;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEntity {
    Appointment,
    BlockedTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Monotonic per feed; later writes carry larger numbers.
    pub sequence: u64,
    pub entity: ChangeEntity,
    pub entity_id: Uuid,
    pub kind: ChangeKind,
    pub record: Value,
    pub emitted_at: DateTime<Utc>,
}

/// In-process fan-out of appointment and blocked-time writes.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
    sequence: Arc<AtomicU64>,
    subscribers: Arc<AtomicUsize>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn publish<T: Serialize>(&self, entity: ChangeEntity, entity_id: Uuid, kind: ChangeKind, record: &T) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let record = serde_json::to_value(record).unwrap_or(Value::Null);

        let event = ChangeEvent {
            sequence,
            entity,
            entity_id,
            kind,
            record,
            emitted_at: Utc::now(),
        };

        // no receivers is not an error
        if self.sender.send(event).is_err() {
            debug!("Change {} for {} had no listeners", sequence, entity_id);
        }
        sequence
    }

    pub fn subscribe(&self) -> Subscription {
        self.subscribers.fetch_add(1, Ordering::SeqCst);
        Subscription {
            receiver: self.sender.subscribe(),
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

/// Listener handle. Dropping it releases the listener.
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    subscribers: Arc<AtomicUsize>,
}

impl Subscription {
    /// Next event, or `None` once the feed is gone. Lagging listeners skip ahead.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Change listener lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.subscribers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Viewer-side model keyed by entity id. Each live id keeps the newest
/// sequence seen, so duplicates and stale out-of-order deliveries are dropped.
/// Deleted ids leave the map and only a bounded tombstone list remains.
#[derive(Debug, Default)]
pub struct EntityVersions {
    latest: HashMap<Uuid, u64>,
    tombstones: VecDeque<(Uuid, u64)>,
}

impl EntityVersions {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_seen(&self, id: &Uuid) -> Option<u64> {
        self.latest.get(id).copied().or_else(|| {
            self.tombstones
                .iter()
                .rev()
                .find(|(deleted, _)| deleted == id)
                .map(|(_, sequence)| *sequence)
        })
    }

    /// Whether the event changes the viewer's state.
    pub fn accept(&mut self, event: &ChangeEvent) -> bool {
        if matches!(self.newest_seen(&event.entity_id), Some(seen) if seen >= event.sequence) {
            return false;
        }

        if event.kind == ChangeKind::Deleted {
            self.latest.remove(&event.entity_id);
            if self.tombstones.len() == TOMBSTONE_CAPACITY {
                self.tombstones.pop_front();
            }
            self.tombstones.push_back((event.entity_id, event.sequence));
        } else {
            self.latest.insert(event.entity_id, event.sequence);
        }
        true
    }

    /// Live entities tracked.
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscribers_receive_published_changes() {
        let feed = ChangeFeed::new();
        let mut subscription = feed.subscribe();
        let id = Uuid::new_v4();

        let sequence = feed.publish(ChangeEntity::Appointment, id, ChangeKind::Inserted, &json!({"id": id}));

        let event = subscription.recv().await.unwrap();
        assert_eq!(event.sequence, sequence);
        assert_eq!(event.entity_id, id);
        assert_eq!(event.kind, ChangeKind::Inserted);
    }

    #[test]
    fn dropping_a_subscription_releases_it() {
        let feed = ChangeFeed::new();
        let first = feed.subscribe();
        let second = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 2);

        drop(first);
        assert_eq!(feed.subscriber_count(), 1);
        drop(second);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn publishing_without_listeners_still_advances_sequence() {
        let feed = ChangeFeed::new();
        let a = feed.publish(ChangeEntity::BlockedTime, Uuid::new_v4(), ChangeKind::Deleted, &json!({}));
        let b = feed.publish(ChangeEntity::BlockedTime, Uuid::new_v4(), ChangeKind::Deleted, &json!({}));
        assert!(b > a);
    }

    #[tokio::test]
    async fn viewer_drops_duplicates_and_stale_events() {
        let feed = ChangeFeed::new();
        let mut subscription = feed.subscribe();
        let id = Uuid::new_v4();
        feed.publish(ChangeEntity::Appointment, id, ChangeKind::Inserted, &json!({"status": "confirmed"}));
        feed.publish(ChangeEntity::Appointment, id, ChangeKind::Updated, &json!({"status": "mailbox"}));

        let inserted = subscription.recv().await.unwrap();
        let updated = subscription.recv().await.unwrap();

        let mut versions = EntityVersions::new();
        assert!(versions.accept(&updated));
        // older event delivered late
        assert!(!versions.accept(&inserted));
        // same event delivered twice
        assert!(!versions.accept(&updated));
        assert_eq!(versions.len(), 1);
    }

    fn event(id: Uuid, sequence: u64, kind: ChangeKind) -> ChangeEvent {
        ChangeEvent {
            sequence,
            entity: ChangeEntity::BlockedTime,
            entity_id: id,
            kind,
            record: json!({}),
            emitted_at: Utc::now(),
        }
    }

    #[test]
    fn deleted_entities_are_forgotten() {
        let mut versions = EntityVersions::new();
        for sequence in 1..=200 {
            let id = Uuid::new_v4();
            assert!(versions.accept(&event(id, sequence, ChangeKind::Inserted)));
            assert!(versions.accept(&event(id, sequence + 1000, ChangeKind::Deleted)));
        }
        assert!(versions.is_empty());
        assert!(versions.tombstones.len() <= TOMBSTONE_CAPACITY);
    }

    #[test]
    fn late_update_after_delete_is_dropped() {
        let mut versions = EntityVersions::new();
        let id = Uuid::new_v4();

        assert!(versions.accept(&event(id, 3, ChangeKind::Deleted)));
        assert!(!versions.accept(&event(id, 2, ChangeKind::Updated)));
        assert_eq!(versions.len(), 0);
    }
}
