//! Ports layer for access control.

pub mod outbound;

pub use outbound::{ConsumerPermissionLookup, ParticipantDirectory};
