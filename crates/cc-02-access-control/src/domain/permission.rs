//! Consumer permission algorithm over one scope's tiers.

use super::validator::AceValidator;
use shared_types::{
    MasterAccessControlEntry, MediatorAccessControlEntry, OwnerAccessControlEntry, Permission,
    TrustLevel,
};

/// Outcome of an interface-level permission lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfacePermission {
    /// A decision for the whole interface.
    Permission(Permission),
    /// Operation-specific entries exist; ask again with the operation name.
    OperationNeeded,
}

/// Registered provider scope of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderInterface {
    pub domain: String,
    pub interface_name: String,
}

impl ProviderInterface {
    pub fn new(domain: impl Into<String>, interface_name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            interface_name: interface_name.into(),
        }
    }
}

/// Decide the consumer permission for a platform of the given trust level.
///
/// Inconsistent tiers deny. Otherwise the most specific tier present
/// decides: owner, then mediator default, then master default. A tier whose
/// required trust level exceeds `trust_level` denies.
pub fn consumer_permission(
    master: Option<&MasterAccessControlEntry>,
    mediator: Option<&MediatorAccessControlEntry>,
    owner: Option<&OwnerAccessControlEntry>,
    trust_level: TrustLevel,
) -> Permission {
    if !AceValidator::new(master, mediator, owner).is_valid() {
        return Permission::No;
    }

    let (required, permission) = match (owner, mediator, master) {
        (Some(owner), _, _) => (owner.required_trust_level, owner.consumer_permission),
        (None, Some(entry), _) | (None, None, Some(entry)) => (
            entry.default_required_trust_level,
            entry.default_consumer_permission,
        ),
        (None, None, None) => return Permission::No,
    };

    if trust_level >= required {
        permission
    } else {
        Permission::No
    }
}
