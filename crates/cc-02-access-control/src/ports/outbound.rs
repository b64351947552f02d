//! Outbound (Driven) ports for access control.

use crate::domain::{InterfacePermission, ProviderInterface};
use async_trait::async_trait;
use shared_types::{Permission, TrustLevel};

/// Asynchronous source of consumer permissions.
///
/// Each call yields exactly one answer.
#[async_trait]
pub trait ConsumerPermissionLookup: Send + Sync {
    /// Interface-level lookup; may ask for an operation-level lookup instead.
    async fn consumer_permission(
        &self,
        user_id: &str,
        domain: &str,
        interface_name: &str,
        trust_level: TrustLevel,
    ) -> InterfacePermission;

    /// Operation-level lookup.
    async fn operation_permission(
        &self,
        user_id: &str,
        domain: &str,
        interface_name: &str,
        operation: &str,
        trust_level: TrustLevel,
    ) -> Permission;
}

/// Resolves a provider participant to the interface it implements.
pub trait ParticipantDirectory: Send + Sync {
    fn lookup(&self, participant_id: &str) -> Option<ProviderInterface>;
}
