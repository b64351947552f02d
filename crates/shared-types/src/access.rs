//! # Access Control Entries
//!
//! Three tiers of entries describe who may call what:
//!
//! - **Master**: defaults plus the allowed ranges for consumer permission and
//!   required trust level.
//! - **Mediator**: same shape as master; narrows the master's ranges.
//! - **Owner**: a concrete permission and trust level chosen by the domain
//!   owner, constrained by mediator (or master when there is no mediator).
//!
//! Any of `uid` or `operation` may be [`WILDCARD`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Matches every user id or every operation.
pub const WILDCARD: &str = "*";

/// Consumer permission granted by an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    No,
    Ask,
    Yes,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Permission::No, Permission::Ask, Permission::Yes];
}

/// Trust level of the platform a consumer runs on. Ordered `Low < Mid < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrustLevel {
    Low,
    Mid,
    High,
}

impl TrustLevel {
    pub const ALL: [TrustLevel; 3] = [TrustLevel::Low, TrustLevel::Mid, TrustLevel::High];
}

/// Identity of an entry within its tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AceKey {
    pub uid: String,
    pub domain: String,
    pub interface_name: String,
    pub operation: String,
}

impl AceKey {
    pub fn new(
        uid: impl Into<String>,
        domain: impl Into<String>,
        interface_name: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            domain: domain.into(),
            interface_name: interface_name.into(),
            operation: operation.into(),
        }
    }
}

/// Master (or mediator) access control entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterAccessControlEntry {
    pub uid: String,
    pub domain: String,
    pub interface_name: String,
    pub operation: String,
    pub default_required_trust_level: TrustLevel,
    pub possible_required_trust_levels: BTreeSet<TrustLevel>,
    pub default_consumer_permission: Permission,
    pub possible_consumer_permissions: BTreeSet<Permission>,
}

/// Mediator entries share the master's shape.
pub type MediatorAccessControlEntry = MasterAccessControlEntry;

impl MasterAccessControlEntry {
    /// Entry allowing every permission and trust level, defaulting to
    /// `Permission::No` at `TrustLevel::High`.
    pub fn new(
        uid: impl Into<String>,
        domain: impl Into<String>,
        interface_name: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            domain: domain.into(),
            interface_name: interface_name.into(),
            operation: operation.into(),
            default_required_trust_level: TrustLevel::High,
            possible_required_trust_levels: TrustLevel::ALL.into_iter().collect(),
            default_consumer_permission: Permission::No,
            possible_consumer_permissions: Permission::ALL.into_iter().collect(),
        }
    }

    pub fn with_permissions(
        mut self,
        default: Permission,
        possible: impl IntoIterator<Item = Permission>,
    ) -> Self {
        self.default_consumer_permission = default;
        self.possible_consumer_permissions = possible.into_iter().collect();
        self
    }

    pub fn with_trust_levels(
        mut self,
        default: TrustLevel,
        possible: impl IntoIterator<Item = TrustLevel>,
    ) -> Self {
        self.default_required_trust_level = default;
        self.possible_required_trust_levels = possible.into_iter().collect();
        self
    }

    pub fn key(&self) -> AceKey {
        AceKey::new(&self.uid, &self.domain, &self.interface_name, &self.operation)
    }
}

/// Owner access control entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerAccessControlEntry {
    pub uid: String,
    pub domain: String,
    pub interface_name: String,
    pub operation: String,
    pub required_trust_level: TrustLevel,
    pub consumer_permission: Permission,
}

impl OwnerAccessControlEntry {
    pub fn new(
        uid: impl Into<String>,
        domain: impl Into<String>,
        interface_name: impl Into<String>,
        operation: impl Into<String>,
        required_trust_level: TrustLevel,
        consumer_permission: Permission,
    ) -> Self {
        Self {
            uid: uid.into(),
            domain: domain.into(),
            interface_name: interface_name.into(),
            operation: operation.into(),
            required_trust_level,
            consumer_permission,
        }
    }

    pub fn key(&self) -> AceKey {
        AceKey::new(&self.uid, &self.domain, &self.interface_name, &self.operation)
    }
}
