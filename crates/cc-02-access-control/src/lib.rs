//! # Access Control Subsystem
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Decides whether the creator of a provider call may reach its target.
//! Access control entries come in three tiers (master, mediator, owner);
//! the validator keeps them consistent and the resolver turns them into a
//! yes/no decision per message.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Mediator only narrows master | `domain/validator.rs` - `is_mediator_valid()` |
//! | Owner stays inside mediator (else master) range | `domain/validator.rs` - `is_owner_valid()` |
//! | Inconsistent tiers deny | `domain/permission.rs` - `consumer_permission()` |
//! | Invalid entries never stored | `domain/store.rs` - `update_mediator()`, `update_owner()` |
//! | Undecodable payload denies | `service.rs` - `operation_name()` |
//! | At most one operation-level lookup per check | `service.rs` - `has_consumer_permission()` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - LocalDomainAccessController, ProviderDirectory     │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - ConsumerPermissionLookup,                  │
//! │                      ParticipantDirectory                       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/validator.rs  - AceValidator                            │
//! │  domain/permission.rs - consumer_permission()                   │
//! │  domain/store.rs      - DomainAccessStore                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`AccessController`] implements the router's `AccessGate`.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{LocalDomainAccessController, ProviderDirectory};
pub use domain::{
    consumer_permission, AccessControlError, AceValidator, DomainAccessStore,
    InterfacePermission, ProviderInterface,
};
pub use ports::{ConsumerPermissionLookup, ParticipantDirectory};
pub use service::AccessController;
