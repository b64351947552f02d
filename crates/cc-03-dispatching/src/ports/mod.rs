//! Ports for the dispatching subsystem.

pub mod outbound;

pub use outbound::RequestCaller;
