//! Transport sender for participants living in this process.

use crate::adapters::pool::DispatchHandle;
use async_trait::async_trait;
use cc_01_message_routing::MessageSender;
use shared_types::{Address, Envelope, TransportError};
use tracing::trace;

/// Hands envelopes routed to in-process participants to the dispatch pool.
pub struct InProcessMessagingStub {
    handle: DispatchHandle,
}

impl InProcessMessagingStub {
    pub fn new(handle: DispatchHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl MessageSender for InProcessMessagingStub {
    async fn send_message(&self, _address: &Address, envelope: Envelope) -> Result<(), TransportError> {
        trace!(message_id = %envelope.message_id(), to = %envelope.to(), "handing envelope to dispatcher");
        self.handle
            .submit(envelope)
            .await
            .map_err(|_| TransportError::Closed)
    }
}
