//! In-memory registry of local providers and the interfaces they implement.

use crate::domain::ProviderInterface;
use crate::ports::ParticipantDirectory;
use dashmap::DashMap;
use shared_types::ParticipantId;
use tracing::debug;

#[derive(Default)]
pub struct ProviderDirectory {
    providers: DashMap<ParticipantId, ProviderInterface>,
}

impl ProviderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        participant_id: impl Into<ParticipantId>,
        domain: impl Into<String>,
        interface_name: impl Into<String>,
    ) {
        let participant_id = participant_id.into();
        let interface = ProviderInterface::new(domain, interface_name);
        debug!(
            participant_id = %participant_id,
            domain = %interface.domain,
            interface = %interface.interface_name,
            "registering provider"
        );
        self.providers.insert(participant_id, interface);
    }

    pub fn unregister(&self, participant_id: &str) -> Option<ProviderInterface> {
        self.providers.remove(participant_id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl ParticipantDirectory for ProviderDirectory {
    fn lookup(&self, participant_id: &str) -> Option<ProviderInterface> {
        self.providers.get(participant_id).map(|e| e.value().clone())
    }
}
