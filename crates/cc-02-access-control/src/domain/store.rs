//! In-memory domain access control store.
//!
//! Holds the master, mediator and owner tables. Lookups prefer an exact user
//! id over [`WILDCARD`], and for each user id an exact operation over
//! [`WILDCARD`]:
//!
//! | Try | uid     | operation |
//! |-----|---------|-----------|
//! | 1   | user    | operation |
//! | 2   | user    | `*`       |
//! | 3   | `*`     | operation |
//! | 4   | `*`     | `*`       |

use super::errors::AccessControlError;
use super::validator::AceValidator;
use parking_lot::RwLock;
use shared_types::{
    AceKey, MasterAccessControlEntry, MediatorAccessControlEntry, OwnerAccessControlEntry,
    WILDCARD,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One tier's entries keyed by scope.
struct AceTable<E> {
    entries: RwLock<HashMap<AceKey, E>>,
}

impl<E: Clone> AceTable<E> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, key: AceKey, entry: E) {
        self.entries.write().insert(key, entry);
    }

    fn remove(&self, key: &AceKey) -> bool {
        self.entries.write().remove(key).is_some()
    }

    fn lookup(&self, uid: &str, domain: &str, interface_name: &str, operation: &str) -> Option<E> {
        let entries = self.entries.read();
        let mut uids = vec![uid];
        if uid != WILDCARD {
            uids.push(WILDCARD);
        }
        let mut operations = vec![operation];
        if operation != WILDCARD {
            operations.push(WILDCARD);
        }

        uids.iter()
            .flat_map(|u| operations.iter().map(move |o| (*u, *o)))
            .find_map(|(u, o)| entries.get(&AceKey::new(u, domain, interface_name, o)).cloned())
    }

    /// All entries of an interface applying to `uid` (or to every user).
    fn for_interface(&self, uid: &str, domain: &str, interface_name: &str) -> Vec<(AceKey, E)> {
        self.entries
            .read()
            .iter()
            .filter(|(key, _)| {
                (key.uid == uid || key.uid == WILDCARD)
                    && key.domain == domain
                    && key.interface_name == interface_name
            })
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Master, mediator and owner access control tables.
pub struct DomainAccessStore {
    master: AceTable<MasterAccessControlEntry>,
    mediator: AceTable<MediatorAccessControlEntry>,
    owner: AceTable<OwnerAccessControlEntry>,
}

impl Default for DomainAccessStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainAccessStore {
    pub fn new() -> Self {
        Self {
            master: AceTable::new(),
            mediator: AceTable::new(),
            owner: AceTable::new(),
        }
    }

    pub fn update_master(&self, entry: MasterAccessControlEntry) {
        debug!(key = ?entry.key(), "updating master ACE");
        self.master.insert(entry.key(), entry);
    }

    /// Store a mediator entry if it only narrows the applicable master entry.
    pub fn update_mediator(
        &self,
        entry: MediatorAccessControlEntry,
    ) -> Result<(), AccessControlError> {
        let key = entry.key();
        let master = self.master_entry(&key.uid, &key.domain, &key.interface_name, &key.operation);
        if !AceValidator::new(master.as_ref(), Some(&entry), None).is_mediator_valid() {
            warn!(key = ?key, "rejecting mediator ACE that widens its master");
            return Err(AccessControlError::InvalidEntry {
                tier: "mediator",
                key,
            });
        }
        debug!(key = ?key, "updating mediator ACE");
        self.mediator.insert(key, entry);
        Ok(())
    }

    /// Store an owner entry if it lies within the applicable mediator/master range.
    pub fn update_owner(&self, entry: OwnerAccessControlEntry) -> Result<(), AccessControlError> {
        let key = entry.key();
        let master = self.master_entry(&key.uid, &key.domain, &key.interface_name, &key.operation);
        let mediator =
            self.mediator_entry(&key.uid, &key.domain, &key.interface_name, &key.operation);
        let validator = AceValidator::new(master.as_ref(), mediator.as_ref(), Some(&entry));
        if !validator.is_owner_valid() {
            warn!(key = ?key, "rejecting owner ACE outside the allowed range");
            return Err(AccessControlError::InvalidEntry { tier: "owner", key });
        }
        debug!(key = ?key, "updating owner ACE");
        self.owner.insert(key, entry);
        Ok(())
    }

    pub fn remove_master(&self, key: &AceKey) -> bool {
        self.master.remove(key)
    }

    pub fn remove_mediator(&self, key: &AceKey) -> bool {
        self.mediator.remove(key)
    }

    pub fn remove_owner(&self, key: &AceKey) -> bool {
        self.owner.remove(key)
    }

    pub fn master_entry(
        &self,
        uid: &str,
        domain: &str,
        interface_name: &str,
        operation: &str,
    ) -> Option<MasterAccessControlEntry> {
        self.master.lookup(uid, domain, interface_name, operation)
    }

    pub fn mediator_entry(
        &self,
        uid: &str,
        domain: &str,
        interface_name: &str,
        operation: &str,
    ) -> Option<MediatorAccessControlEntry> {
        self.mediator.lookup(uid, domain, interface_name, operation)
    }

    pub fn owner_entry(
        &self,
        uid: &str,
        domain: &str,
        interface_name: &str,
        operation: &str,
    ) -> Option<OwnerAccessControlEntry> {
        self.owner.lookup(uid, domain, interface_name, operation)
    }

    /// Whether any tier has an operation-specific entry for this interface
    /// that applies to `uid`.
    pub fn has_operation_entries(&self, uid: &str, domain: &str, interface_name: &str) -> bool {
        let specific = |key: &AceKey| key.operation != WILDCARD;
        self.master
            .for_interface(uid, domain, interface_name)
            .iter()
            .any(|(k, _)| specific(k))
            || self
                .mediator
                .for_interface(uid, domain, interface_name)
                .iter()
                .any(|(k, _)| specific(k))
            || self
                .owner
                .for_interface(uid, domain, interface_name)
                .iter()
                .any(|(k, _)| specific(k))
    }

    /// Number of (master, mediator, owner) entries.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.master.len(), self.mediator.len(), self.owner.len())
    }
}
