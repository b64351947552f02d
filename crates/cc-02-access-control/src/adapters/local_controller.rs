//! Permission lookup backed by the local [`DomainAccessStore`].

use crate::domain::{consumer_permission, DomainAccessStore, InterfacePermission};
use crate::ports::ConsumerPermissionLookup;
use async_trait::async_trait;
use shared_types::{Permission, TrustLevel, WILDCARD};
use std::sync::Arc;
use tracing::trace;

/// Answers permission queries from the in-memory ACL tables.
#[derive(Clone)]
pub struct LocalDomainAccessController {
    store: Arc<DomainAccessStore>,
}

impl LocalDomainAccessController {
    pub fn new(store: Arc<DomainAccessStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<DomainAccessStore> {
        &self.store
    }

    fn decide(
        &self,
        user_id: &str,
        domain: &str,
        interface_name: &str,
        operation: &str,
        trust_level: TrustLevel,
    ) -> Permission {
        let master = self.store.master_entry(user_id, domain, interface_name, operation);
        let mediator = self
            .store
            .mediator_entry(user_id, domain, interface_name, operation);
        let owner = self.store.owner_entry(user_id, domain, interface_name, operation);
        consumer_permission(
            master.as_ref(),
            mediator.as_ref(),
            owner.as_ref(),
            trust_level,
        )
    }
}

#[async_trait]
impl ConsumerPermissionLookup for LocalDomainAccessController {
    async fn consumer_permission(
        &self,
        user_id: &str,
        domain: &str,
        interface_name: &str,
        trust_level: TrustLevel,
    ) -> InterfacePermission {
        if self
            .store
            .has_operation_entries(user_id, domain, interface_name)
        {
            trace!(user_id, domain, interface_name, "operation-level lookup needed");
            return InterfacePermission::OperationNeeded;
        }
        InterfacePermission::Permission(self.decide(
            user_id,
            domain,
            interface_name,
            WILDCARD,
            trust_level,
        ))
    }

    async fn operation_permission(
        &self,
        user_id: &str,
        domain: &str,
        interface_name: &str,
        operation: &str,
        trust_level: TrustLevel,
    ) -> Permission {
        self.decide(user_id, domain, interface_name, operation, trust_level)
    }
}
