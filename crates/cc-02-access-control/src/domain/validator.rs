//! Three-tier access control entry validation.
//!
//! ```text
//! Master ──narrowed by──→ Mediator (optional) ──constrains──→ Owner (optional)
//! ```
//!
//! A mediator may only narrow what its master allows. An owner must pick a
//! permission and trust level still allowed by the mediator, or by the
//! master when there is no mediator. An owner alone is self-authoritative.

use shared_types::{
    MasterAccessControlEntry, MediatorAccessControlEntry, OwnerAccessControlEntry,
};

/// Pure decision over the three optional tiers for one scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AceValidator<'a> {
    master: Option<&'a MasterAccessControlEntry>,
    mediator: Option<&'a MediatorAccessControlEntry>,
    owner: Option<&'a OwnerAccessControlEntry>,
}

impl<'a> AceValidator<'a> {
    pub fn new(
        master: Option<&'a MasterAccessControlEntry>,
        mediator: Option<&'a MediatorAccessControlEntry>,
        owner: Option<&'a OwnerAccessControlEntry>,
    ) -> Self {
        Self {
            master,
            mediator,
            owner,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_mediator_valid() && self.is_owner_valid()
    }

    /// A mediator needs a master to refine, and must not widen it.
    pub fn is_mediator_valid(&self) -> bool {
        let Some(mediator) = self.mediator else {
            return true;
        };
        let Some(master) = self.master else {
            return false;
        };

        let permissions_narrowed = mediator
            .possible_consumer_permissions
            .is_subset(&master.possible_consumer_permissions)
            && master
                .possible_consumer_permissions
                .contains(&mediator.default_consumer_permission);

        let trust_levels_narrowed = mediator
            .possible_required_trust_levels
            .is_subset(&master.possible_required_trust_levels)
            && master
                .possible_required_trust_levels
                .contains(&mediator.default_required_trust_level);

        permissions_narrowed && trust_levels_narrowed
    }

    /// The owner is checked against the mediator if present, else the master.
    pub fn is_owner_valid(&self) -> bool {
        let Some(owner) = self.owner else {
            return true;
        };
        match self.mediator.or(self.master) {
            Some(target) => {
                target
                    .possible_consumer_permissions
                    .contains(&owner.consumer_permission)
                    && target
                        .possible_required_trust_levels
                        .contains(&owner.required_trust_level)
            }
            None => true,
        }
    }
}
