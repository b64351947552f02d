//! # Dispatching Subsystem
//!
//! **Subsystem ID:** 3
//!
//! ## Purpose
//!
//! Receives envelopes routed to participants living in this process and
//! acts on them by message type: provider calls are invoked and answered,
//! replies and publications are matched to the consumer waiting for them.
//! Also the consumer-side entry point for sending requests and subscribing.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Expired envelopes cause no side effects | `service.rs` - `handle()` |
//! | A reply resolves at most one pending request | `domain/correlation.rs` - `resolve_reply()` |
//! | Subscription failure notifies the listener once | `domain/correlation.rs` - `resolve_subscription_reply()` |
//! | Unanswered requests fail after expiry | `domain/correlation.rs` - `remove_expired()` |
//! | Callbacks never run under the table lock | `domain/correlation.rs` |
//! | Answers expire with the request they answer | `service.rs` - `send_answer()` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - DispatchPool, InProcessMessagingStub,              │
//! │              MessagingFacade, ProxyConnector                    │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↓ uses ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service.rs     - Dispatcher                                    │
//! │  publication.rs - PublicationManager                            │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↓ uses ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/correlation.rs - CorrelationTable                       │
//! │  domain/callers.rs     - RequestCallerDirectory                 │
//! │  domain/listeners.rs   - ProviderListeners                      │
//! │  domain/cache.rs       - ClientQCache                           │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↓ calls ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - RequestCaller (local provider)             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod publication;
pub mod service;

pub use adapters::{
    expiry_sweep_task, DispatchHandle, DispatchPool, InProcessMessagingStub, MessagingFacade,
    MessagingQos, ProxyConnector, DEFAULT_MESSAGING_TTL,
};
pub use domain::{
    CachedValue, ChangeListener, ClientCache, ClientQCache, CorrelationTable, DispatchError,
    ListenerHandle, ProviderListeners, RequestCallerDirectory, SubscriptionListener,
};
pub use ports::RequestCaller;
pub use publication::PublicationManager;
pub use service::Dispatcher;
