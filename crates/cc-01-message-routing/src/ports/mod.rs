//! Ports layer for message routing.

pub mod inbound;
pub mod outbound;

pub use inbound::MessageRouter;
pub use outbound::{AccessGate, MessageSender};
