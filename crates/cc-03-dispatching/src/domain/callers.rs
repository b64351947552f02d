//! Directory of local providers reachable by the dispatcher.

use crate::ports::RequestCaller;
use dashmap::DashMap;
use shared_types::ParticipantId;
use std::sync::Arc;
use tracing::info;

#[derive(Default)]
pub struct RequestCallerDirectory {
    callers: DashMap<ParticipantId, Arc<dyn RequestCaller>>,
}

impl RequestCallerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the provider serving `participant_id`, replacing any previous one.
    pub fn add(&self, participant_id: impl Into<ParticipantId>, caller: Arc<dyn RequestCaller>) {
        let participant_id = participant_id.into();
        info!(participant_id = %participant_id, "provider registered");
        self.callers.insert(participant_id, caller);
    }

    pub fn remove(&self, participant_id: &str) -> Option<Arc<dyn RequestCaller>> {
        self.callers.remove(participant_id).map(|(_, caller)| caller)
    }

    pub fn get(&self, participant_id: &str) -> Option<Arc<dyn RequestCaller>> {
        self.callers.get(participant_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.callers.contains_key(participant_id)
    }

    pub fn len(&self) -> usize {
        self.callers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }
}
