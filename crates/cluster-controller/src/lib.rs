//! # Cluster Controller Runtime Library
//!
//! This library exposes the runtime wiring for the binary and for tests.
//! The main entry point is the `main.rs` binary.
//!
//! ## Data Flow
//!
//! ```text
//! Transport skeleton ──→ Router ──→ next hop known?
//!                           │         │ no → MessageQueue
//!                           │ yes     │      (flushed when the
//!                           ↓         │       hop is learned)
//!                   MessageSender for the hop kind ←──┘
//!                           │
//!             in-process ───┴─── MQTT / HTTP / WebSocket
//!                 │
//!           (access gate)
//!                 │
//!                 ↓
//!           DispatchPool ──→ Dispatcher ──→ provider / CorrelationTable
//!                                  │
//!                                  └──→ Router (replies, publications)
//! ```
//!
//! ## Modules
//!
//! - `config` - Configuration loading and validation
//! - `logging` - Tracing subscriber setup
//! - `runtime` - Subsystem wiring and lifecycle

pub mod config;
pub mod logging;
pub mod runtime;

pub use config::{ClusterControllerConfig, ConfigError};
pub use logging::{init_logging, LoggingError};
pub use runtime::ClusterController;
