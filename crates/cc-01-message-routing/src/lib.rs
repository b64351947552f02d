//! # Message Routing Subsystem
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Owns the participant → next-hop routing table, holds messages whose
//! destination is not yet reachable, and hands resolvable messages to the
//! transport sender for the hop's address kind. Transport ingress skeletons
//! decode inbound text, learn reply paths and feed the router.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Expired envelopes are dropped before any side effect | `service.rs` - `route()`, `flush_queued()` |
//! | Hops are last-writer-wins | `domain/routing_table.rs` - `insert()` |
//! | Per-participant FIFO queue, decay time = expiry date | `domain/queue.rs` - `enqueue()`, `take_next()` |
//! | Malformed input never mutates routing state | `adapters/skeleton.rs` - `on_text_message_received()` |
//! | Transport failures surface once, never retried | `service.rs` - `send_to()` |
//!
//! ## Locking
//!
//! The routing table and the message queue each have their own lock; no
//! lock is held across an `.await`.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - MQTT / HTTP / WebSocket / in-process skeletons,    │
//! │              queue sweep task                                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ drives ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - MessageRouter                              │
//! │  ports/outbound.rs - MessageSender, AccessGate                  │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/queue.rs         - MessageQueue, QueueEntry             │
//! │  domain/routing_table.rs - RoutingTable                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{
    queue_sweep_task, HttpMessagingSkeleton, InProcessMessagingSkeleton, MqttMessagingSkeleton,
    TransportIngressSkeleton, WebSocketMessagingSkeleton,
};
pub use domain::{MessageQueue, QueueEntry, RouteOutcome, RoutingTable};
pub use ports::{AccessGate, MessageRouter, MessageSender};
pub use service::Router;
