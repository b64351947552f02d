//! Outbound (Driven) ports for the routing subsystem.
//!
//! These traits define what the router needs from transports and from the
//! access-control subsystem.

use async_trait::async_trait;
use shared_types::{Address, Envelope, TransportError};

/// Transport-specific sender for one address kind.
///
/// Implementations report failure exactly once through the returned
/// `Result`; success is never reported as an error.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, address: &Address, envelope: Envelope)
        -> Result<(), TransportError>;
}

/// Consumer-permission gate consulted before a provider call reaches a
/// provider hosted in this process.
#[async_trait]
pub trait AccessGate: Send + Sync {
    /// `true` iff the envelope's creator may invoke its target.
    async fn has_consumer_permission(&self, envelope: &Envelope) -> bool;
}
