//! Inbound (Driving) port: the routing API used by ingress and dispatching.

use crate::domain::RouteOutcome;
use async_trait::async_trait;
use shared_types::{Address, Envelope, RoutingError};

#[async_trait]
pub trait MessageRouter: Send + Sync {
    /// Deliver, queue or drop an envelope.
    ///
    /// A transport failure is returned once and never retried.
    async fn route(&self, envelope: Envelope) -> Result<RouteOutcome, RoutingError>;

    /// Learn (or overwrite) the next hop of a participant.
    fn add_next_hop(&self, participant_id: &str, address: Address);

    /// Forget the next hop of a participant.
    fn remove_next_hop(&self, participant_id: &str) -> Option<Address>;
}
