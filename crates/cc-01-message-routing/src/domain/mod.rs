//! Domain layer for message routing.

pub mod queue;
pub mod routing_table;

pub use queue::{MessageQueue, QueueEntry};
pub use routing_table::RoutingTable;

/// What happened to an envelope handed to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Handed to the transport sender of the resolved hop.
    Delivered,
    /// No hop known yet; held in the message queue.
    Queued,
    /// Past its expiry date; dropped.
    Expired,
    /// Consumer permission denied; dropped.
    Denied,
}
