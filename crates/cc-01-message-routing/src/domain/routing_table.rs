//! Participant id to next-hop address mapping.

use parking_lot::RwLock;
use shared_types::{Address, ParticipantId};
use std::collections::HashMap;

/// Last-writer-wins routing table. Entries never expire on their own.
#[derive(Default)]
pub struct RoutingTable {
    hops: RwLock<HashMap<ParticipantId, Address>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hop for a participant, returning the address it replaced.
    pub fn insert(&self, participant_id: ParticipantId, address: Address) -> Option<Address> {
        self.hops.write().insert(participant_id, address)
    }

    pub fn lookup(&self, participant_id: &str) -> Option<Address> {
        self.hops.read().get(participant_id).cloned()
    }

    pub fn remove(&self, participant_id: &str) -> Option<Address> {
        self.hops.write().remove(participant_id)
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.hops.read().contains_key(participant_id)
    }

    pub fn len(&self) -> usize {
        self.hops.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.read().is_empty()
    }
}
