//! # Shared Types Crate
//!
//! This crate contains the routed `Envelope`, transport addresses, RPC and
//! pub/sub payloads, and access-control entries shared by every cluster
//! controller subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Well-Formed Envelopes Only**: An `Envelope` can only be decoded from the
//!   wire if it has a known type, a non-empty payload and an expiry date.
//! - **Absolute Expiry**: Every envelope carries an absolute expiry date (epoch
//!   milliseconds); it is the sole cancellation mechanism in the system.

pub mod access;
pub mod address;
pub mod envelope;
pub mod errors;
pub mod payloads;
pub mod time;

pub use access::*;
pub use address::*;
pub use envelope::{headers, Envelope, MessageType};
pub use errors::*;
pub use payloads::*;
pub use time::*;

/// Identifier of a participant (proxy or provider) known to the routing table.
pub type ParticipantId = String;
