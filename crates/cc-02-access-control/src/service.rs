//! Consumer permission resolver.
//!
//! ## Protocol
//!
//! ```text
//! envelope.to ──directory──→ (domain, interface)
//!      │
//!      ▼
//! interface-level lookup ──Yes/No──→ done
//!      │ Ask / operation needed
//!      ▼
//! decode payload → operation name ──decode error──→ deny
//!      │
//!      ▼
//! operation-level lookup (exactly once) → Yes?
//! ```

use crate::domain::{InterfacePermission, ProviderInterface};
use crate::ports::{ConsumerPermissionLookup, ParticipantDirectory};
use async_trait::async_trait;
use cc_01_message_routing::AccessGate;
use shared_types::{
    Envelope, MessageType, OneWayRequest, Permission, Request, SubscriptionRequest, TrustLevel,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Decides whether an envelope's creator may invoke its target provider.
pub struct AccessController {
    lookup: Arc<dyn ConsumerPermissionLookup>,
    directory: Arc<dyn ParticipantDirectory>,
    trust_level: TrustLevel,
}

impl AccessController {
    pub fn new(
        lookup: Arc<dyn ConsumerPermissionLookup>,
        directory: Arc<dyn ParticipantDirectory>,
        trust_level: TrustLevel,
    ) -> Self {
        Self {
            lookup,
            directory,
            trust_level,
        }
    }

    /// `true` iff the resolved permission is [`Permission::Yes`].
    pub async fn has_consumer_permission(&self, envelope: &Envelope) -> bool {
        let Some(provider) = self.directory.lookup(envelope.to()) else {
            warn!(
                message_id = %envelope.message_id(),
                participant_id = %envelope.to(),
                "target is not a known provider, denying"
            );
            return false;
        };
        let user_id = envelope.creator_user_id().unwrap_or_default();

        let interface_permission = self
            .lookup
            .consumer_permission(
                user_id,
                &provider.domain,
                &provider.interface_name,
                self.trust_level,
            )
            .await;

        match interface_permission {
            InterfacePermission::Permission(Permission::Yes) => true,
            InterfacePermission::Permission(Permission::No) => false,
            InterfacePermission::Permission(Permission::Ask)
            | InterfacePermission::OperationNeeded => {
                self.has_operation_permission(envelope, user_id, &provider)
                    .await
            }
        }
    }

    async fn has_operation_permission(
        &self,
        envelope: &Envelope,
        user_id: &str,
        provider: &ProviderInterface,
    ) -> bool {
        let Some(operation) = operation_name(envelope) else {
            return false;
        };
        debug!(
            message_id = %envelope.message_id(),
            operation = %operation,
            "checking operation-level permission"
        );
        let permission = self
            .lookup
            .operation_permission(
                user_id,
                &provider.domain,
                &provider.interface_name,
                &operation,
                self.trust_level,
            )
            .await;
        permission == Permission::Yes
    }
}

/// The operation a provider call targets, if its payload can be decoded.
fn operation_name(envelope: &Envelope) -> Option<String> {
    let decoded = match envelope.msg_type() {
        MessageType::Request => envelope.decode_body::<Request>().map(|r| r.method_name),
        MessageType::OneWay => envelope
            .decode_body::<OneWayRequest>()
            .map(|r| r.method_name),
        MessageType::SubscriptionRequest | MessageType::BroadcastSubscriptionRequest => envelope
            .decode_body::<SubscriptionRequest>()
            .map(|r| r.subscribed_to_name),
        other => {
            warn!(
                message_id = %envelope.message_id(),
                msg_type = %other,
                "message type carries no operation, denying"
            );
            return None;
        }
    };

    match decoded {
        Ok(operation) => Some(operation),
        Err(e) => {
            error!(error = %e, "cannot extract operation name, denying");
            None
        }
    }
}

#[async_trait]
impl AccessGate for AccessController {
    async fn has_consumer_permission(&self, envelope: &Envelope) -> bool {
        AccessController::has_consumer_permission(self, envelope).await
    }
}
