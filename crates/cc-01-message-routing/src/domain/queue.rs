//! Holding area for messages whose destination has no known next hop yet.
//!
//! Entries are kept per destination participant in arrival order. Each entry
//! carries its own decay time; the periodic sweep removes decayed entries,
//! but a consumer of `take_next` must still check expiry itself.

use parking_lot::Mutex;
use shared_types::{Envelope, ParticipantId, TimeSource, Timestamp};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

/// An envelope waiting for its destination to become resolvable.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub envelope: Envelope,
    pub decay_time: Timestamp,
}

impl QueueEntry {
    pub fn new(envelope: Envelope) -> Self {
        let decay_time = envelope.expiry_date();
        Self {
            envelope,
            decay_time,
        }
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.decay_time < now
    }
}

/// TTL-indexed message queue keyed by destination participant.
pub struct MessageQueue {
    entries: Mutex<HashMap<ParticipantId, VecDeque<QueueEntry>>>,
    time: Arc<dyn TimeSource>,
}

impl MessageQueue {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            time,
        }
    }

    /// Queue an envelope under its destination. Returns the total queue depth.
    pub fn enqueue(&self, envelope: Envelope) -> usize {
        let mut entries = self.entries.lock();
        let participant_id = envelope.to().to_string();
        trace!(
            message_id = %envelope.message_id(),
            participant_id = %participant_id,
            "enqueueing message"
        );
        entries
            .entry(participant_id)
            .or_default()
            .push_back(QueueEntry::new(envelope));
        entries.values().map(VecDeque::len).sum()
    }

    /// Remove and return the oldest entry queued for a participant.
    ///
    /// The returned entry may already be expired.
    pub fn take_next(&self, participant_id: &str) -> Option<QueueEntry> {
        let mut entries = self.entries.lock();
        let queue = entries.get_mut(participant_id)?;
        let entry = queue.pop_front();
        if queue.is_empty() {
            entries.remove(participant_id);
        }
        entry
    }

    /// Put a taken entry back at the head of its participant's queue.
    pub fn requeue_front(&self, entry: QueueEntry) {
        let participant_id = entry.envelope.to().to_string();
        trace!(
            message_id = %entry.envelope.message_id(),
            participant_id = %participant_id,
            "requeueing message at head"
        );
        self.entries
            .lock()
            .entry(participant_id)
            .or_default()
            .push_front(entry);
    }

    /// Remove every entry whose decay time has passed. Returns the count removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.time.now();
        let mut entries = self.entries.lock();
        let mut removed = 0;

        entries.retain(|participant_id, queue| {
            let before = queue.len();
            queue.retain(|entry| !entry.is_expired_at(now));
            let dropped = before - queue.len();
            if dropped > 0 {
                debug!(
                    participant_id = %participant_id,
                    dropped,
                    "dropping expired queued messages"
                );
            }
            removed += dropped;
            !queue.is_empty()
        });

        removed
    }

    /// Whether anything is waiting for this participant.
    pub fn contains_participant(&self, participant_id: &str) -> bool {
        self.entries.lock().contains_key(participant_id)
    }

    /// Number of entries waiting for one participant.
    pub fn len_for(&self, participant_id: &str) -> usize {
        self.entries
            .lock()
            .get(participant_id)
            .map_or(0, VecDeque::len)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
